use std::{
    net::TcpListener,
    sync::atomic::{AtomicU16, Ordering},
};

use anyhow::{bail, Result};

static NEXT_PORT: AtomicU16 = AtomicU16::new(20000);

/// A localhost tcp port nothing is listening on. Ports are handed out once per
/// test process, but another program can still take one before the test binds it.
pub fn get_available_port() -> Result<u16> {
    loop {
        let port = NEXT_PORT.fetch_add(1, Ordering::SeqCst);
        if port == u16::MAX {
            bail!("no ports left");
        }
        if TcpListener::bind(("127.0.0.1", port)).is_ok() {
            return Ok(port);
        }
    }
}
