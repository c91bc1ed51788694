// Layout verification - ensures the snapshot records keep their wire layout
// Run with: cargo test -p plasma-common layout_verify
