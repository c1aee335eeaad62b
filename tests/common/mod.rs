#![allow(dead_code)]

use axpert_gateway::axpert::{AxpertConnector, codec};
use axpert_gateway::connector::Connector;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

pub const SERIAL: &str = "92931701100715";
pub const QPIGS: &str = "230.0 49.9 229.9 49.9 0436 0390 008 394 52.10 012 078 0035 02.3 310.4 52.13 00000 00110110 00 00 00717 010";
pub const QPGS0: &str = "1 92931701100715 B 00 000.0 00.00 230.0 50.00 0276 0223 005 51.4 000 068 000.0 000 00276 00223 005 10100010 0 1 100 120 30 00 000";
pub const QPIRI: &str = "230.0 21.7 230.0 50.0 21.7 5000 4000 48.0 46.0 42.0 56.4 54.0 2 30 060 0 2 3 9 01 0 0 54.0 0 1";
pub const QPIWS: &str = "00000000000000000000000000000000";

/// Replies keyed by command, plus every command the device received
#[derive(Clone, Default)]
pub struct Script {
    pub replies: Arc<Mutex<HashMap<String, String>>>,
    pub received: Arc<Mutex<Vec<String>>>,
}

impl Script {
    pub fn healthy(serial: &str) -> Self {
        let script = Self::default();
        script.set("QID", serial);
        script.set("QPIGS", QPIGS);
        script.set("QPGS0", QPGS0);
        script.set("QPIRI", QPIRI);
        script.set("QPIWS", QPIWS);
        script.set("QMOD", "B");
        script.set("QOPM", "00");
        for write in ["POP00", "POP01", "POP02", "PCP00", "PCP01", "PCP02", "PCP03"] {
            script.set(write, "ACK");
        }
        script
    }

    pub fn set(&self, command: &str, reply: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(command.to_string(), reply.to_string());
    }

    pub fn remove(&self, command: &str) {
        self.replies.lock().unwrap().remove(command);
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

/// Serve `script` on the device end of a duplex pipe.
///
/// Commands without a scripted reply get no answer at all, which the
/// connector sees as a timeout.
pub fn simulate(script: Script, mut device: DuplexStream) {
    tokio::spawn(async move {
        let mut request = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match device.read(&mut byte).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
            request.push(byte[0]);
            if byte[0] != b'\r' {
                continue;
            }
            let command = String::from_utf8_lossy(&request[..request.len() - 3]).into_owned();
            request.clear();
            script.received.lock().unwrap().push(command.clone());
            let reply = script.replies.lock().unwrap().get(&command).cloned();
            if let Some(reply) = reply
                && device.write_all(&codec::encode_response(&reply)).await.is_err()
            {
                return;
            }
        }
    });
}

pub fn simulated_connector(script: Script) -> Box<dyn Connector> {
    let (client, device) = duplex(4096);
    simulate(script, device);
    Box::new(AxpertConnector::new(
        client,
        "/dev/sim",
        Duration::from_millis(100),
    ))
}
