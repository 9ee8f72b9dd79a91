pub(super) fn grpc_port() -> u16 {
    9000
}

pub(super) fn host() -> String {
    String::from("0.0.0.0")
}

pub(super) fn log_level() -> String {
    String::from("info")
}
