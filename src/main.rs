use anyhow::{Context, Result};
use bytes::{BufMut, Bytes, BytesMut};
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use wl1271_cmd::command::{Command, CommandHeader, CommandId, CommandStatus, HEADER_SIZE};
use wl1271_cmd::constants::{
    ACX_REG_INTERRUPT_ACK, ACX_REG_INTERRUPT_NO_CLEAR, ACX_REG_INTERRUPT_TRIG, DISCONNECT_EVENT_COMPLETE_ID,
    ETH_ALEN, INTR_CMD_COMPLETE, JOIN_EVENT_COMPLETE_ID,
};
use wl1271_cmd::keys::{KeyAction, KeyParams, KeyType};
use wl1271_cmd::memory::ReadMemoryCommand;
use wl1271_cmd::nvs::Nvs;
use wl1271_cmd::power::PsMode;
use wl1271_cmd::scan::{ScanBand, ScanCompletion, ScanRequest};
use wl1271_cmd::{BandInfo, BssType, Channel, CommandChannel, Conf, FrameBuilder, SystemClock, Transport, Wl1271};

const SIM_CMD_BOX: u32 = 0x0004_0000;
const SIM_EVENT_MBOX_A: u32 = 0x0004_1000;
const SIM_EVENT_MBOX_B: u32 = 0x0004_1100;
const SIM_CMD_BOX_SIZE: usize = 1024;

/// Drives the wl1271 command engine against an in-memory firmware model.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Optional JSON driver configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long)]
    log_file: Option<PathBuf>,
    /// SSID to join.
    #[arg(short, long, default_value = "wl1271-sim")]
    ssid: String,
    /// 2.4 GHz channel to join on.
    #[arg(long, default_value_t = 6)]
    channel: u8,
    /// Band to scan.
    #[arg(short, long, value_enum, default_value_t = SimBand::Dual)]
    band: SimBand,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SimBand {
    #[value(name = "2.4")]
    Band2_4,
    #[value(name = "5")]
    Band5,
    Dual,
}

impl From<SimBand> for ScanBand {
    fn from(band: SimBand) -> Self {
        match band {
            SimBand::Band2_4 => ScanBand::Band2_4,
            SimBand::Band5 => ScanBand::Band5,
            SimBand::Dual => ScanBand::Dual,
        }
    }
}

/// Firmware model: accepts every command, completes it immediately and
/// posts the matching completion event.
struct SimFirmware {
    cmd_box: Vec<u8>,
    intr: u32,
    events: u32,
    commands: Vec<CommandId>,
}

impl SimFirmware {
    fn new() -> Self {
        Self {
            cmd_box: vec![0; SIM_CMD_BOX_SIZE],
            intr: 0,
            events: 0,
            commands: Vec::new(),
        }
    }

    fn run_command(&mut self) {
        let Ok(header) = CommandHeader::from_buffer(&self.cmd_box) else {
            return;
        };
        let id = header.command();
        debug!(%id, "sim: executing");
        self.commands.push(id);

        self.events = match id {
            CommandId::StartJoin => JOIN_EVENT_COMPLETE_ID,
            CommandId::Disconnect => DISCONNECT_EVENT_COMPLETE_ID,
            _ => 0,
        };

        if id == CommandId::ReadMemory {
            let value = &mut self.cmd_box[ReadMemoryCommand::VALUE_OFFSET..ReadMemoryCommand::SIZE];
            for (i, b) in value.iter_mut().enumerate() {
                *b = i as u8;
            }
        }

        self.cmd_box[2..HEADER_SIZE].copy_from_slice(&u16::from(CommandStatus::Success).to_le_bytes());
        self.intr |= INTR_CMD_COMPLETE;
    }
}

fn bad_address(addr: u32) -> io::Error {
    io::Error::new(io::ErrorKind::AddrNotAvailable, format!("no sim memory at {addr:#010x}"))
}

impl Transport for SimFirmware {
    fn write_bytes(&mut self, addr: u32, buf: &[u8]) -> io::Result<()> {
        if addr != SIM_CMD_BOX || buf.len() > self.cmd_box.len() {
            return Err(bad_address(addr));
        }
        self.cmd_box[..buf.len()].copy_from_slice(buf);
        Ok(())
    }

    fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> io::Result<()> {
        match addr {
            SIM_CMD_BOX if buf.len() <= self.cmd_box.len() => buf.copy_from_slice(&self.cmd_box[..buf.len()]),
            SIM_EVENT_MBOX_A if buf.len() == 4 => buf.copy_from_slice(&self.events.to_le_bytes()),
            SIM_EVENT_MBOX_B if buf.len() == 4 => buf.fill(0),
            _ => return Err(bad_address(addr)),
        }
        Ok(())
    }

    fn read_register32(&mut self, addr: u32) -> io::Result<u32> {
        match addr {
            ACX_REG_INTERRUPT_NO_CLEAR => Ok(self.intr),
            _ => Err(bad_address(addr)),
        }
    }

    fn write_register32(&mut self, addr: u32, value: u32) -> io::Result<()> {
        match addr {
            ACX_REG_INTERRUPT_TRIG => self.run_command(),
            ACX_REG_INTERRUPT_ACK => self.intr &= !value,
            _ => return Err(bad_address(addr)),
        }
        Ok(())
    }
}

/// Minimal 802.11 frame builder for the simulated association.
struct SimFrames {
    bssid: [u8; ETH_ALEN],
    own_addr: [u8; ETH_ALEN],
    aid: u16,
}

impl SimFrames {
    fn header(&self, frame_control: u16, duration: u16, addr1: &[u8; ETH_ALEN], addr3: &[u8; ETH_ALEN]) -> BytesMut {
        let mut frame = BytesMut::with_capacity(64);
        frame.put_u16_le(frame_control);
        frame.put_u16_le(duration);
        frame.put_slice(addr1);
        frame.put_slice(&self.own_addr);
        frame.put_slice(addr3);
        frame.put_u16_le(0);
        frame
    }
}

impl FrameBuilder for SimFrames {
    fn null_data(&self) -> Option<Bytes> {
        // data, nullfunc, to DS
        Some(self.header(0x0148, 0, &self.bssid, &self.bssid).freeze())
    }

    fn ps_poll(&self) -> Option<Bytes> {
        let mut frame = BytesMut::with_capacity(16);
        frame.put_u16_le(0x00a4);
        frame.put_u16_le(self.aid | 0xc000);
        frame.put_slice(&self.bssid);
        frame.put_slice(&self.own_addr);
        Some(frame.freeze())
    }

    fn probe_request(&self, ssid: &[u8], ie: &[u8]) -> Option<Bytes> {
        let broadcast = [0xff; ETH_ALEN];
        let mut frame = self.header(0x0040, 0, &broadcast, &broadcast);
        frame.put_u8(0);
        frame.put_u8(ssid.len() as u8);
        frame.put_slice(ssid);
        // supported rates: 1, 2, 5.5, 11 Mbps
        frame.put_slice(&[1, 4, 0x82, 0x84, 0x8b, 0x96]);
        frame.put_slice(ie);
        Some(frame.freeze())
    }
}

/// Console output for the simulation run, mirrored without colour to
/// `log_file` when given. `RUST_LOG` takes precedence over `-v`/`-q`.
fn setup_logging(log_file: Option<&Path>, verbosity: &Verbosity<InfoLevel>) -> Result<Option<WorkerGuard>> {
    let file_sink = log_file
        .map(|path| {
            File::create(path)
                .with_context(|| format!("cannot open simulator log {}", path.display()))
                .map(tracing_appender::non_blocking)
        })
        .transpose()?;
    let (file_writer, guard) = file_sink.unzip();

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time())
        .with(file_writer.map(|writer| fmt::layer().with_writer(writer).with_ansi(false)))
        .init();

    if let Some(path) = log_file {
        debug!("sim log mirrored to {}", path.display());
    }
    Ok(guard)
}

fn load_conf(path: Option<&PathBuf>) -> Result<Conf> {
    let Some(path) = path else {
        return Ok(Conf::default());
    };
    let json = fs::read_to_string(path).with_context(|| format!("cannot read driver config {}", path.display()))?;
    Ok(Conf::from_json(&json)?)
}

fn sim_bands() -> BandInfo {
    let mut channels_2ghz: Vec<Channel> = (1..=13).map(Channel::enabled).collect();
    channels_2ghz.push(Channel {
        hw_value: 14,
        disabled: true,
    });
    BandInfo {
        channels_2ghz,
        channels_5ghz: [36, 40, 44, 48].into_iter().map(Channel::enabled).collect(),
        a_band_enabled: true,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file.as_deref(), &cli.verbose)?;

    if let Err(e) = run_sim(&cli) {
        error!("simulation aborted: {e:#}");
        process::exit(1);
    }

    Ok(())
}

fn run_sim(cli: &Cli) -> Result<()> {
    let conf = load_conf(cli.config.as_ref())?;
    let bssid = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
    let own_addr = [0x02, 0x00, 0x00, 0x12, 0x71, 0x01];

    let frames = SimFrames {
        bssid,
        own_addr,
        aid: 1,
    };
    let channel = CommandChannel::new(
        SimFirmware::new(),
        SystemClock::new(),
        SIM_CMD_BOX,
        [SIM_EVENT_MBOX_A, SIM_EVENT_MBOX_B],
    );
    let nvs = Nvs::from_bytes(&[0u8; Nvs::SIZE])?;
    let mut wl = Wl1271::new(channel, conf, Box::new(frames))
        .with_bands(sim_bands())
        .with_nvs(nvs);

    info!("Uploading NVS parameters");
    wl.general_parms()?;
    wl.radio_parms()?;
    wl.data_path(true)?;

    wl.bss.bssid = bssid;
    wl.bss.mac_addr = own_addr;
    wl.bss.ssid = cli.ssid.as_bytes().to_vec();
    wl.bss.channel = cli.channel;
    wl.bss.basic_rate_set = wl.conf().tx.basic_rate;
    wl.bss.basic_rate = wl.conf().tx.basic_rate;

    info!(ssid = %cli.ssid, channel = cli.channel, "Joining");
    wl.join(BssType::StaBss)?;

    wl.build_null_data()?;
    wl.build_klv_null_data()?;
    wl.build_ps_poll()?;
    wl.build_qos_null_data()?;

    let tkip: Vec<u8> = (0..32).collect();
    wl.set_key(&KeyParams {
        action: KeyAction::AddOrReplace,
        id: 0,
        key_type: KeyType::Tkip,
        key: &tkip,
        addr: bssid,
        tx_seq_32: 0,
        tx_seq_16: 0,
    })?;
    wl.ps_mode(PsMode::Power, true)?;

    let band = ScanBand::from(cli.band);
    info!(%band, "Scanning");
    wl.scan(&ScanRequest {
        ssid: cli.ssid.as_bytes(),
        ie: &[],
        active: true,
        high_prio: false,
        band,
        probe_requests: 3,
    })?;
    loop {
        match wl.scan_complete()? {
            ScanCompletion::ContinuingOn5Ghz => info!("Continuing scan on 5 GHz"),
            ScanCompletion::Finished | ScanCompletion::Idle => break,
        }
    }

    let dump = wl.read_memory(0x0030_0000, 16)?;
    info!(data = %hex::encode(&dump), "Memory dump");

    wl.ps_mode(PsMode::Active, true)?;
    wl.disconnect()?;
    wl.data_path(false)?;

    let session = wl.session();
    println!("--------------------------------------------------------------------------------");
    println!("session counter : {}", session.session_counter());
    println!("calibrated      : {}", session.is_calibrated());
    println!("scanning        : {}", session.is_scanning());
    println!("scan state      : {:?}", session.scan());
    let commands = &wl.channel().transport().commands;
    println!("commands sent   : {}", commands.len());
    for id in commands {
        println!("  {id}");
    }

    Ok(())
}
