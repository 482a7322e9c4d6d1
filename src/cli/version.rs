/// Display version information
pub fn execute() {
    println!("biochain {}", env!("CARGO_PKG_VERSION"));
    println!("Tracker for the biochain group game");
}
