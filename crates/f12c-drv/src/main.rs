fn main() {
    if let Err(err) = f12c_drv::main() {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
