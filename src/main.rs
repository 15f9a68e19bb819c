fn main() {
    aero_repeatability::cli::run();
}
