mod commands;

fn main() {
    commands::run();
}
