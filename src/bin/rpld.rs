use std::env;
use std::error::Error;
use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use env_logger::Builder;
use getopts::{Matches, Options};
use log::{error, info, warn, LevelFilter};

use rpld::config::{DEFAULT_CONFIG_PATH, RECV_BUFFER_SIZE};
use rpld::iface::{Daemon, Interface};
use rpld::phy::{self, Icmpv6Socket, Netlink, Transport};
use rpld::seed::Seed;
use rpld::time::Instant;

const FORWARDING: &str = "/proc/sys/net/ipv6/conf/all/forwarding";
const MAX_HBH_OPTS: &str = "/proc/sys/net/ipv6/max_hbh_opts_number";

static RUNNING: AtomicBool = AtomicBool::new(true);

extern "C" fn on_signal(_: libc::c_int) {
    RUNNING.store(false, Ordering::SeqCst);
}

fn setup_logging(level: LevelFilter) {
    let start = Instant::now();
    Builder::new()
        .format(move |buf, record| {
            let elapsed = Instant::now() - start;
            writeln!(
                buf,
                "[{}] {} ({}): {}",
                elapsed,
                record.level(),
                record.target().trim_start_matches("rpld::"),
                record.args()
            )
        })
        .filter(None, level)
        .parse_filters(&env::var("RUST_LOG").unwrap_or_default())
        .init();
}

fn parse_options(options: &Options) -> Matches {
    match options.parse(env::args().skip(1)) {
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1)
        }
        Ok(matches) => {
            if matches.opt_present("h") || !matches.free.is_empty() {
                let brief = format!("Usage: {} [OPTION]...", env!("CARGO_PKG_NAME"));
                print!("{}", options.usage(&brief));
                process::exit(if matches.free.is_empty() { 0 } else { 1 })
            }
            if matches.opt_present("v") {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                process::exit(0)
            }
            matches
        }
    }
}

fn level(matches: &Matches) -> LevelFilter {
    match matches.opt_str("d").map(|s| s.parse::<u8>()) {
        None => LevelFilter::Info,
        Some(Ok(1)) => LevelFilter::Error,
        Some(Ok(2)) => LevelFilter::Warn,
        Some(Ok(3)) => LevelFilter::Info,
        Some(Ok(4)) => LevelFilter::Debug,
        Some(Ok(5)) => LevelFilter::Trace,
        Some(_) => {
            eprintln!("debug level must be between 1 and 5");
            process::exit(1)
        }
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0)
}

fn handle_signals() {
    let handler = on_signal as extern "C" fn(libc::c_int);
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
    }
}

fn run(matches: &Matches) -> Result<(), Box<dyn Error>> {
    let path = matches
        .opt_str("C")
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let seed = Seed::load(&path).map_err(|err| format!("{}: {}", path, err))?;

    let mut netlink = Netlink::new()?;
    let socket = Icmpv6Socket::new()?;

    for (sysctl, value) in [(FORWARDING, 1), (MAX_HBH_OPTS, 99)] {
        if let Err(err) = phy::write_sysctl(sysctl, value) {
            warn!("cannot set {} to {}: {}", sysctl, value, err);
        }
    }

    let mut interfaces = Vec::new();
    for iface_seed in &seed.ifaces {
        let name = &iface_seed.ifname;
        let index = phy::if_nametoindex(name).map_err(|err| format!("{}: {}", name, err))?;
        let link_addr = netlink
            .link_address(index)
            .map_err(|err| format!("{}: link-layer address: {}", name, err))?;

        let mut iface = Interface::new(index, name, &link_addr, iface_seed.dodag_root);
        for address in phy::interface_addresses(name)? {
            iface.add_address(address);
        }
        if iface.link_local().is_none() {
            warn!("{}: no link-local address", name);
        }
        socket
            .join(index)
            .map_err(|err| format!("{}: joining ff02::1a: {}", name, err))?;
        interfaces.push((iface, iface_seed));
    }

    let mut daemon = Daemon::new(socket, netlink, clock_seed());
    daemon.set_trickle(matches.opt_present("trickle"));
    for (iface, iface_seed) in interfaces {
        daemon.seed_interface(iface, iface_seed);
    }

    handle_signals();
    daemon.start(Instant::now());
    info!("version {} started", env!("CARGO_PKG_VERSION"));

    let mut buffer = [0u8; RECV_BUFFER_SIZE];
    while RUNNING.load(Ordering::SeqCst) {
        let fd = daemon.transport().as_raw_fd();
        phy::wait(fd, daemon.poll_delay(Instant::now()))?;

        loop {
            match daemon.transport_mut().recv(&mut buffer) {
                Ok(Some(meta)) => daemon.process(
                    Instant::now(),
                    meta.ifindex,
                    meta.src,
                    &buffer[..meta.len],
                    meta.hop_limit,
                ),
                Ok(None) => break,
                Err(err) => {
                    warn!("receive failed: {}", err);
                    break;
                }
            }
        }
        daemon.poll(Instant::now());
    }

    info!("exited");
    Ok(())
}

fn main() {
    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help menu");
    opts.optflag("v", "version", "print the version");
    opts.optopt(
        "C",
        "config",
        &format!("configuration file (default {})", DEFAULT_CONFIG_PATH),
        "PATH",
    );
    opts.optopt(
        "d",
        "debug",
        "log verbosity, from 1 (errors) to 5 (every packet)",
        "N",
    );
    opts.optflag("", "trickle", "pace DIOs with the Trickle timer");

    let matches = parse_options(&opts);
    setup_logging(level(&matches));

    if let Err(err) = run(&matches) {
        error!("{}", err);
        process::exit(1);
    }
}
