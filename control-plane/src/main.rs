fn main() {
    control_plane::server::run();
}
