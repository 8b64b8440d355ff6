//! A TCP terminal on a TUN interface.
//!
//! Brings up the named interface, terminates the TCP connections arriving on it and lets the user
//! send data on them from standard input. Call example:
//!
//! * `tcpterm-shell tun0 --interface 192.168.0.1/24 --host 192.168.0.2`
//!
//! Then, for example, `nc 192.168.0.2 4000` from the host and `reply:hello` in the terminal.
use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;

use log::info;
use tcpterm::Endpoint;
use tcpterm::layer::tcp::{FourTuple, SendHandle, SendOutcome};
use tcpterm::nic::TunInterface;
use tcpterm_shell::{config, Command, MANUAL};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::Config::from_args();

    let interface = TunInterface::open(&config.tun, config.interface)
        .expect("Couldn't initialize interface");
    info!("interface {} up with {}, local address {}", interface.name(), config.interface, config.host);

    println!("Welcome to TCP terminal");
    println!("{}", MANUAL);

    let endpoint = Arc::new(Endpoint::new(interface, config.endpoint())
        .expect("Couldn't start the endpoint"));

    let receiver = {
        let endpoint = endpoint.clone();
        thread::Builder::new()
            .name("tcpterm-recv".into())
            .spawn(move || endpoint.run())
            .expect("Couldn't spawn the receive thread")
    };

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                eprintln!("[TCP Shell] {}", err);
                break;
            },
        };

        match line.parse::<Command>() {
            Ok(command) => execute(&endpoint, config.host, command),
            Err(invalid) => println!("{}", invalid),
        }
    }

    let _ = receiver.join();
}

fn execute(endpoint: &Endpoint<TunInterface>, host: tcpterm::wire::Ipv4Address, command: Command) {
    let result = match command {
        Command::Send { remote, remote_port, local_port, data } => {
            let flow = FourTuple { local: host, local_port, remote, remote_port };
            endpoint.send(flow, data).map(report)
        },
        Command::Reply { data } => match endpoint.last_received() {
            Some(flow) => endpoint.send(flow, data).map(report),
            None => {
                println!("[TCP Shell] Nothing received yet");
                return;
            },
        },
        Command::Connect { remote, remote_port, local_port } => {
            let flow = FourTuple { local: host, local_port, remote, remote_port };
            endpoint.open(flow)
        },
    };

    if let Err(err) = result {
        println!("[TCP Shell] {}", err);
    }
}

/// Print the outcome of a send once it is known, without blocking the prompt.
fn report(handle: SendHandle) {
    thread::spawn(move || {
        let flow = handle.flow();
        match handle.wait() {
            SendOutcome::Acknowledged { attempts } => {
                println!("[TCP Shell] {}: delivered after {} attempts", flow, attempts)
            },
            SendOutcome::Exhausted { attempts } => {
                println!("[TCP Shell] {}: not acknowledged after {} attempts", flow, attempts)
            },
        }
    });
}
