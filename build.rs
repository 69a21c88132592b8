fn main() {
    // Migrations are embedded into the binary.
    println!("cargo:rerun-if-changed=migrations");
}
