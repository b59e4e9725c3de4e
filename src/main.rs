use log::error;

fn main() {
    env_logger::init();

    if let Err(e) = vessel_track::get_arg().and_then(vessel_track::run) {
        error!("{e:#}");
        std::process::exit(-1);
    }
}
