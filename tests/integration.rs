//! Drives the gateway over a real TCP socket with a Modbus *client*,
//! confirming the encode/decode and clamp-on-write behavior end-to-end
//! rather than only through the in-process `registers` functions (§8).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_modbus::client::tcp::connect;
use tokio_modbus::prelude::*;

use plant_twin::gateway::{Gateway, RegisterBank};
use plant_twin::params::Parameters;
use plant_twin::registers;
use plant_twin::TwinError;

async fn spawn_gateway() -> (SocketAddr, tokio::task::JoinHandle<Result<(), TwinError>>) {
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let listener = Gateway::bind(addr).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let bank = Arc::new(Mutex::new(RegisterBank::new(&Parameters::default())));
    let gateway = Gateway::new(bank);
    let handle = tokio::spawn(gateway.serve(listener));

    // Give the listener a moment to settle before the client connects.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, handle)
}

#[tokio::test]
async fn reads_default_coils_and_setpoints() {
    let (addr, _gateway) = spawn_gateway().await;
    let mut ctx = connect(addr).await.unwrap();

    let coils = ctx.read_coils(0, registers::NUM_COILS as u16).await.unwrap().unwrap();
    assert_eq!(coils, vec![true, true, true]);

    let holdings = ctx.read_holding_registers(100, 3).await.unwrap().unwrap();
    assert_eq!(holdings[0], registers::encode_naoh_dose(Parameters::default().naoh_dose_nom));
    assert_eq!(holdings[1], registers::encode_cl_dose(Parameters::default().cl_dose_nom));
    assert_eq!(holdings[2], registers::encode_q_out_sp(Parameters::default().q_out_nom));
}

#[tokio::test]
async fn write_coil_then_read_back() {
    let (addr, _gateway) = spawn_gateway().await;
    let mut ctx = connect(addr).await.unwrap();

    ctx.write_single_coil(registers::COIL_RO_ON as u16, false).await.unwrap().unwrap();
    let coils = ctx.read_coils(0, registers::NUM_COILS as u16).await.unwrap().unwrap();
    assert_eq!(coils, vec![true, false, true]);
}

#[tokio::test]
async fn setpoint_write_is_clamped_and_reads_back_clamped() {
    let (addr, _gateway) = spawn_gateway().await;
    let mut ctx = connect(addr).await.unwrap();

    // 65535 raw at x100 decodes to 655.35 mg/L, far outside [0, 50].
    ctx.write_single_register(registers::HOLD_NAOH_DOSE as u16, 65535).await.unwrap().unwrap();
    let holdings = ctx.read_holding_registers(registers::HOLD_NAOH_DOSE as u16, 1).await.unwrap().unwrap();
    assert_eq!(holdings[0], registers::encode_naoh_dose(50.0));
}

#[tokio::test]
async fn measurement_block_rejects_writes() {
    let (addr, _gateway) = spawn_gateway().await;
    let mut ctx = connect(addr).await.unwrap();

    let result = ctx.write_single_register(registers::HOLD_PH_MEAS as u16, 700).await.unwrap();
    assert!(result.is_err());
}

#[tokio::test]
async fn write_multiple_holdings_clamps_each_setpoint() {
    let (addr, _gateway) = spawn_gateway().await;
    let mut ctx = connect(addr).await.unwrap();

    ctx.write_multiple_registers(100, &[2000, 2000, 5000]).await.unwrap().unwrap();
    let holdings = ctx.read_holding_registers(100, 3).await.unwrap().unwrap();
    assert_eq!(holdings[0], registers::encode_naoh_dose(20.0));
    assert_eq!(holdings[1], registers::encode_cl_dose(10.0)); // clamped from 20 mg/L
    assert_eq!(holdings[2], registers::encode_q_out_sp(200.0)); // clamped from 500 m3/h
}
