//! Plays a scripted Go-Back-N transfer at the bridge and obeys control
//! messages sent back to it, so the bridge and observers can be exercised
//! without the real protocol engine.

use clap::Parser;
use rand::Rng;
use shared::{
    decode_control, encode_event, ControlMessage, WireEvent, DEFAULT_CONTROL_PORT,
    DEFAULT_EVENT_PORT, MAX_LOSS_CHANCE, MAX_WINDOW_SIZE, MIN_WINDOW_SIZE,
};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::time::{interval, Duration};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bridge event address
    #[arg(short, long, default_value_t = SocketAddr::from(([127, 0, 0, 1], DEFAULT_EVENT_PORT)))]
    bridge: SocketAddr,

    /// Port to listen on for control messages
    #[arg(short, long, default_value_t = DEFAULT_CONTROL_PORT)]
    control_port: u16,

    /// Initial window size
    #[arg(short, long, default_value = "5")]
    window: u32,

    /// Initial loss chance in percent
    #[arg(short, long, default_value = "10")]
    loss: u32,

    /// Name of the simulated file
    #[arg(short, long, default_value = "test.jpg")]
    file_name: String,

    /// Size of the simulated file in bytes
    #[arg(short, long, default_value = "65536")]
    size: u64,

    /// Payload bytes per packet
    #[arg(long, default_value = "1024")]
    chunk: u64,

    /// Milliseconds between simulated round trips
    #[arg(short, long, default_value = "250")]
    tick_ms: u64,
}

struct Probe {
    socket: UdpSocket,
    bridge: SocketAddr,
    window: u64,
    loss: u32,
    base: u64,
    next: u64,
    packets: u64,
    chunk: u64,
    size: u64,
    file_name: String,
}

impl Probe {
    async fn emit(&self, event: WireEvent) -> Result<(), Box<dyn std::error::Error>> {
        let data = encode_event(&event)?;
        self.socket.send_to(&data, self.bridge).await?;
        println!("-> {:?}", event);
        Ok(())
    }

    fn window_end(&self) -> u64 {
        self.base + self.window - 1
    }

    fn apply_control(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::SetWindow { size } => {
                self.window = u64::from(size.clamp(MIN_WINDOW_SIZE, MAX_WINDOW_SIZE));
                println!("Window size now {}", self.window);
            }
            ControlMessage::SetLoss { chance } => {
                self.loss = chance.min(MAX_LOSS_CHANCE);
                println!("Loss chance now {}%", self.loss);
            }
        }
    }

    /// One round trip: fill the window, then either ACK the base or time it
    /// out and go back N. Returns false once the file is complete.
    async fn step(&mut self) -> Result<bool, Box<dyn std::error::Error>> {
        if self.base >= self.packets {
            return Ok(false);
        }

        while self.next <= self.window_end() && self.next < self.packets {
            self.emit(WireEvent::PacketSent {
                seq: self.next,
                window_start: Some(self.base),
                window_end: Some(self.window_end()),
            })
            .await?;
            self.next += 1;
        }

        let lost = rand::thread_rng().gen_range(0..100) < self.loss;
        if lost {
            self.emit(WireEvent::Timeout { seq: self.base }).await?;
            for seq in self.base..self.next {
                self.emit(WireEvent::Retransmit { seq }).await?;
            }
            return Ok(true);
        }

        self.emit(WireEvent::PacketReceived { seq: self.base }).await?;
        self.emit(WireEvent::AckSent { ack: self.base }).await?;
        self.emit(WireEvent::AckReceived { ack: self.base }).await?;

        let old_start = self.base;
        self.base += 1;
        self.emit(WireEvent::WindowMoved {
            old_start: Some(old_start),
            new_start: self.base,
            new_end: self.window_end(),
        })
        .await?;

        self.emit(WireEvent::ProgressUpdate {
            received: (self.base * self.chunk).min(self.size),
            total: self.size,
            file_name: Some(self.file_name.clone()),
            timestamp: Some(shared::now_millis()),
        })
        .await?;

        if self.base >= self.packets {
            self.emit(WireEvent::FileComplete {
                filename: self.file_name.clone(),
                size: self.size,
            })
            .await?;
            return Ok(false);
        }

        Ok(true)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let control = UdpSocket::bind(("127.0.0.1", args.control_port)).await?;
    println!("Sending events to {}", args.bridge);
    println!("Listening for control messages on {}", control.local_addr()?);

    let chunk = args.chunk.max(1);
    let mut probe = Probe {
        socket,
        bridge: args.bridge,
        window: u64::from(args.window.clamp(MIN_WINDOW_SIZE, MAX_WINDOW_SIZE)),
        loss: args.loss.min(MAX_LOSS_CHANCE),
        base: 0,
        next: 0,
        packets: args.size.div_ceil(chunk),
        chunk,
        size: args.size,
        file_name: args.file_name,
    };

    let mut ticker = interval(Duration::from_millis(args.tick_ms.max(1)));
    let mut buf = [0u8; 256];

    loop {
        tokio::select! {
            result = control.recv_from(&mut buf) => {
                let (len, addr) = result?;
                match decode_control(&buf[..len]) {
                    Ok(message) => probe.apply_control(message),
                    Err(e) => println!("Ignoring control datagram from {}: {}", addr, e),
                }
            }
            _ = ticker.tick() => {
                if !probe.step().await? {
                    break;
                }
            }
        }
    }

    println!("Transfer of {} bytes finished", probe.size);
    Ok(())
}
