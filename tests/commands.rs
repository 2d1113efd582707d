//! Templates, keys, parameter access, power save and memory reads

mod common;

use common::*;
use wl1271_cmd::acx::ACX_WAKE_UP_CONDITIONS;
use wl1271_cmd::calibration::ChannelTuneCommand;
use wl1271_cmd::command::{ACX_HEADER_SIZE, Command};
use wl1271_cmd::config::CONF_WAKE_UP_EVENT_DTIM;
use wl1271_cmd::keys::{KeyAction, KeyParams, KeyType};
use wl1271_cmd::nvs::Nvs;
use wl1271_cmd::power::PsMode;
use wl1271_cmd::template::{NULL_DATA_TEMPLATE_SIZE, TemplatePayload, TemplateType};

fn key_params(key_type: KeyType, key: &[u8]) -> KeyParams<'_> {
    KeyParams {
        action: KeyAction::AddOrReplace,
        id: 1,
        key_type,
        key,
        addr: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
        tx_seq_32: 7,
        tx_seq_16: 9,
    }
}

// --- templates ---

#[test]
fn test_oversized_template_is_truncated_and_sent() {
    let mut wl = device(MockDevice::new());
    let frame = vec![0x5au8; CMD_TEMPL_MAX_SIZE + 100];

    wl.template_set(TemplateType::Beacon, TemplatePayload::Frame(&frame), 0, 0)
        .expect("template_set failed");

    let dev = mock(&wl);
    let cmd = &dev.sent[0];
    assert_eq!(cmd.len(), 268);
    assert_eq!(u16::from_le_bytes([cmd[4], cmd[5]]) as usize, CMD_TEMPL_MAX_SIZE);
    assert!(cmd[16..].iter().all(|&b| b == 0x5a));
}

#[test]
fn test_template_carries_retry_limits() {
    let conf = Conf::from_json(r#"{"tx": {"short_retry_limit": 4, "long_retry_limit": 3}}"#).expect("bad config");
    let mut wl = Wl1271::new(channel(MockDevice::new()), conf, Box::new(MockFrames::default()));

    wl.build_ps_poll().expect("build_ps_poll failed");

    let cmd = &mock(&wl).sent[0];
    assert_eq!(cmd[6], u8::from(TemplateType::PsPoll));
    assert_eq!(cmd[12], 4);
    assert_eq!(cmd[13], 3);
    assert_eq!(&cmd[16..20], &[0xa4, 0x10, 0x01, 0xc0]);
}

#[test]
fn test_ibss_null_data_is_zero_filled() {
    let mut wl = device(MockDevice::new());
    wl.bss.bss_type = BssType::Ibss;

    wl.build_null_data().expect("build_null_data failed");

    let cmd = &mock(&wl).sent[0];
    assert_eq!(u16::from_le_bytes([cmd[4], cmd[5]]) as usize, NULL_DATA_TEMPLATE_SIZE);
    assert!(cmd[16..].iter().all(|&b| b == 0));
}

#[test]
fn test_missing_frame_is_reported() {
    let frames = MockFrames {
        null_data: None,
        ..MockFrames::default()
    };
    let mut wl = device_with(MockDevice::new(), frames);

    let err = wl.build_null_data().expect_err("expected failure");
    assert!(matches!(err, Error::FrameUnavailable(TemplateType::NullData)));
    let err = wl.build_klv_null_data().expect_err("expected failure");
    assert!(matches!(err, Error::FrameUnavailable(TemplateType::Klv)));
    assert!(mock(&wl).sent.is_empty());
}

#[test]
fn test_qos_null_data_addresses_the_ap() {
    let mut wl = device(MockDevice::new());

    wl.build_qos_null_data().expect("build_qos_null_data failed");

    let cmd = &mock(&wl).sent[0];
    assert_eq!(cmd[6], u8::from(TemplateType::QosNullData));
    assert_eq!(u16::from_le_bytes([cmd[4], cmd[5]]), 26);
    let frame = &cmd[16..42];
    assert_eq!(&frame[..2], &[0xc8, 0x01]);
    assert_eq!(&frame[4..10], &wl.bss.bssid);
    assert_eq!(&frame[10..16], &wl.bss.mac_addr);
}

// --- keys ---

#[test]
fn test_tkip_key_halves_swapped_on_wire() {
    let mut wl = device(MockDevice::new());
    let key: Vec<u8> = (0..32).collect();

    wl.set_key(&key_params(KeyType::Tkip, &key)).expect("set_key failed");

    let cmd = &mock(&wl).sent[0];
    assert_eq!(cmd.len(), 80);
    let wire = &cmd[24..56];
    assert_eq!(&wire[..16], &key[..16]);
    assert_eq!(&wire[16..24], &key[24..32]);
    assert_eq!(&wire[24..32], &key[16..24]);
    assert_eq!(cmd[14], 32);
    assert_eq!(cmd[15], u8::from(KeyType::Tkip));
    assert_eq!(&cmd[4..10], &[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    assert_eq!(&cmd[56..58], &9u16.to_le_bytes());
    assert_eq!(&cmd[64..68], &7u32.to_le_bytes());
}

#[test]
fn test_wep_key_has_no_address() {
    let mut wl = device(MockDevice::new());

    wl.set_key(&key_params(KeyType::Wep, &[0xab; 13])).expect("set_key failed");

    let cmd = &mock(&wl).sent[0];
    assert_eq!(&cmd[4..10], &[0; 6]);
    assert_eq!(cmd[14], 13);
    assert_eq!(&cmd[24..37], &[0xab; 13]);
}

#[test]
fn test_invalid_keys_are_rejected_before_sending() {
    let mut wl = device(MockDevice::new());

    let err = wl.set_key(&key_params(KeyType::Aes, &[0; 40])).expect_err("expected failure");
    assert!(matches!(err, Error::InvalidArgument(_)));
    let err = wl.set_key(&key_params(KeyType::Tkip, &[0; 16])).expect_err("expected failure");
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(mock(&wl).sent.is_empty());
}

#[test]
fn test_default_wep_key() {
    let mut wl = device(MockDevice::new());

    wl.set_default_wep_key(3).expect("set_default_wep_key failed");

    let cmd = &mock(&wl).sent[0];
    assert_eq!(&cmd[10..12], &u16::from(KeyAction::SetId).to_le_bytes());
    assert_eq!(cmd[15], u8::from(KeyType::Wep));
    assert_eq!(cmd[17], 3);
}

// --- NVS upload ---

#[test]
fn test_nvs_missing_is_no_device() {
    let mut wl = device(MockDevice::new());

    assert!(matches!(wl.general_parms(), Err(Error::NoDevice)));
    assert!(matches!(wl.radio_parms(), Err(Error::NoDevice)));
    assert!(mock(&wl).sent.is_empty());
}

#[test]
fn test_nvs_upload() {
    let mut image = vec![0u8; Nvs::SIZE];
    image[..57].fill(0x11);
    let nvs = Nvs::from_bytes(&image).expect("bad NVS image");
    let mut wl = device(MockDevice::new()).with_nvs(nvs);

    wl.general_parms().expect("general_parms failed");
    wl.radio_parms().expect("radio_parms failed");

    let dev = mock(&wl);
    assert_eq!(
        dev.sent_test_ids(),
        vec![TestCommandId::IniFileGeneralParam, TestCommandId::IniFileRadioParam]
    );
    assert_eq!(dev.sent[0].len(), 88);
    assert!(dev.sent[0][8..65].iter().all(|&b| b == 0x11));
    assert_eq!(dev.sent[1].len(), 224);
}

#[test]
fn test_fem_out_of_range() {
    let conf = Conf::from_json(r#"{"radio": {"fem": 5}}"#).expect("bad config");
    let nvs = Nvs::from_bytes(&[0u8; Nvs::SIZE]).expect("bad NVS image");
    let mut wl = Wl1271::new(channel(MockDevice::new()), conf, Box::new(MockFrames::default())).with_nvs(nvs);

    assert!(matches!(wl.radio_parms(), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_nvs_upload_failure_is_reported() {
    let mut dev = MockDevice::new();
    dev.test_failures
        .push((TestCommandId::IniFileRadioParam, CommandStatus::InvalidParam));
    let nvs = Nvs::from_bytes(&[0u8; Nvs::SIZE]).expect("bad NVS image");
    let mut wl = device(dev).with_nvs(nvs);

    wl.general_parms().expect("general_parms failed");
    let err = wl.radio_parms().expect_err("expected rejection");

    assert!(matches!(
        err,
        Error::DeviceRejected {
            command: CommandId::Test,
            status: CommandStatus::InvalidParam
        }
    ));
    assert_eq!(mock(&wl).acks(), 2);
}

// --- test wrapper ---

#[test]
fn test_test_command_with_answer_reads_whole_structure() {
    let mut dev = MockDevice::new();
    dev.responses
        .push((CommandId::Test, vec![0x0d, 0, 0, 0, 0, 7, 0x34, 0x12]));
    let mut wl = device(dev);
    let cmd = ChannelTuneCommand { band: 0, channel: 7 };

    let buf = wl.test(&cmd, true).expect("test command failed");

    assert_eq!(buf.len(), ChannelTuneCommand::SIZE);
    assert_eq!(&buf[10..12], &[0x34, 0x12]);
    assert_eq!(mock(&wl).reads, vec![(CMD_BOX, ChannelTuneCommand::SIZE)]);
}

#[test]
fn test_test_command_without_answer_reads_header() {
    let mut wl = device(MockDevice::new());
    let cmd = ChannelTuneCommand { band: 0, channel: 7 };

    let buf = wl.test(&cmd, false).expect("test command failed");

    assert_eq!(mock(&wl).reads, vec![(CMD_BOX, HEADER_SIZE)]);
    // payload keeps what was sent
    assert_eq!(&buf[HEADER_SIZE..HEADER_SIZE + 6], &[0x0d, 0, 0, 0, 0, 7]);
}

// --- interrogate / configure ---

#[test]
fn test_interrogate_sends_header_and_reads_whole_element() {
    let mut dev = MockDevice::new();
    dev.responses.push((CommandId::Interrogate, vec![0x13, 0x00, 0x08, 0x00, 1, 2, 3, 4, 5, 6, 7, 8]));
    let mut wl = device(dev);
    let mut buf = [0u8; ACX_HEADER_SIZE + 8];

    wl.interrogate(0x0013, &mut buf).expect("interrogate failed");

    let dev = mock(&wl);
    assert_eq!(dev.sent[0], vec![0x01, 0x00, 0x00, 0x00, 0x13, 0x00, 0x08, 0x00]);
    assert_eq!(dev.reads.last(), Some(&(CMD_BOX, 16)));
    assert_eq!(&buf[8..], &[1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn test_configure_sends_whole_element() {
    let mut wl = device(MockDevice::new());
    let mut buf = [0u8; ACX_HEADER_SIZE + 4];
    buf[8..].copy_from_slice(&[9, 8, 7, 6]);

    wl.configure(0x0021, &mut buf).expect("configure failed");

    let dev = mock(&wl);
    assert_eq!(dev.sent[0], vec![0x02, 0x00, 0x00, 0x00, 0x21, 0x00, 0x04, 0x00, 9, 8, 7, 6]);
    assert_eq!(dev.reads.last(), Some(&(CMD_BOX, HEADER_SIZE)));
}

#[test]
fn test_configure_rejects_short_buffer() {
    let mut wl = device(MockDevice::new());

    let err = wl.configure(1, &mut [0u8; 4]).expect_err("expected failure");
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(mock(&wl).sent.is_empty());
}

// --- power save / data path ---

#[test]
fn test_ps_mode_sets_wake_up_conditions_first() {
    let mut wl = device(MockDevice::new());

    wl.ps_mode(PsMode::Power, true).expect("ps_mode failed");

    let dev = mock(&wl);
    assert_eq!(dev.sent_ids(), vec![CommandId::Configure, CommandId::SetPsMode]);
    let acx = &dev.sent[0];
    assert_eq!(&acx[4..6], &ACX_WAKE_UP_CONDITIONS.to_le_bytes());
    assert_eq!(acx[8], CONF_WAKE_UP_EVENT_DTIM);
    assert_eq!(acx[9], 1);
    assert_eq!(hex::encode(&dev.sent[1]), "250000000101050101000000");
}

#[test]
fn test_ps_mode_stops_when_wake_up_conditions_fail() {
    let mut dev = MockDevice::new();
    dev.fail(CommandId::Configure, CommandStatus::InvalidParam);
    let mut wl = device(dev);

    assert!(wl.ps_mode(PsMode::Power, false).is_err());
    assert_eq!(mock(&wl).sent_ids(), vec![CommandId::Configure]);
}

#[test]
fn test_data_path_enable_and_disable() {
    let mut wl = device(MockDevice::new());

    wl.data_path(true).expect("enable failed");
    wl.data_path(false).expect("disable failed");

    let dev = mock(&wl);
    assert_eq!(
        dev.sent_ids(),
        vec![
            CommandId::EnableRx,
            CommandId::EnableTx,
            CommandId::DisableRx,
            CommandId::DisableTx
        ]
    );
    assert!(dev.sent.iter().all(|cmd| cmd.len() == 8 && cmd[4] == 1));
}

#[test]
fn test_data_path_skips_tx_when_rx_fails() {
    let mut dev = MockDevice::new();
    dev.fail(CommandId::EnableRx, CommandStatus::RadioError);
    let mut wl = device(dev);

    assert!(wl.data_path(true).is_err());
    assert_eq!(mock(&wl).sent_ids(), vec![CommandId::EnableRx]);
}

// --- memory ---

#[test]
fn test_read_memory_returns_requested_bytes() {
    let mut dev = MockDevice::new();
    let mut response = vec![0u8; 8];
    response.extend((0..=255u8).collect::<Vec<u8>>());
    dev.responses.push((CommandId::ReadMemory, response));
    let mut wl = device(dev);

    let data = wl.read_memory(0x0030_0000, 16).expect("read_memory failed");

    assert_eq!(data, Bytes::from((0..16u8).collect::<Vec<u8>>()));
    let dev = mock(&wl);
    assert_eq!(hex::encode(&dev.sent[0][..12]), "0d0000000000300010000000");
    assert_eq!(dev.reads.last(), Some(&(CMD_BOX, 268)));
}

#[test]
fn test_read_memory_clamps_length() {
    let mut wl = device(MockDevice::new());

    let data = wl.read_memory(0x1000, 1000).expect("read_memory failed");

    assert_eq!(data.len(), MAX_READ_SIZE);
    assert_eq!(&mock(&wl).sent[0][8..12], &(MAX_READ_SIZE as u32).to_le_bytes());
}

fn assert_send<T: Send>() {}
fn assert_sync<T: Sync>() {}

#[test]
fn test_device_can_be_shared_between_threads() {
    assert_send::<Wl1271<MockDevice, wl1271_cmd::SystemClock>>();
    assert_sync::<std::sync::Mutex<Wl1271<MockDevice, wl1271_cmd::SystemClock>>>();

    let wl = std::sync::Arc::new(std::sync::Mutex::new(device(MockDevice::new())));
    let worker = {
        let wl = std::sync::Arc::clone(&wl);
        std::thread::spawn(move || {
            let mut wl = wl.lock().expect("Failed to lock device");
            wl.set_default_wep_key(2)
        })
    };
    worker
        .join()
        .expect("Worker thread panicked")
        .expect("set_default_wep_key failed");

    let wl = wl.lock().expect("Failed to lock device");
    assert_eq!(mock(&wl).sent_ids(), vec![CommandId::SetKeys]);
}
