use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};

use riscv_gdbserver::backend;
use riscv_gdbserver::session::RspSession;
use riscv_gdbserver::trace::TraceFlags;

/// Start a server for `core` on an ephemeral port, returning that port.
fn spawn_server(core: &'static str) -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    thread::spawn(move || {
        let target = backend::new_target(core).expect("backend construction");
        let mut session = RspSession::new(port, target, TraceFlags::SILENT);
        let _ = session.run_with_listener(listener);
    });
    Ok(port)
}

/// Just enough of a GDB client to drive the server.
struct Client {
    stream: TcpStream,
    no_ack: bool,
}

impl Client {
    fn connect(port: u16) -> Result<Client> {
        let stream = TcpStream::connect(("127.0.0.1", port))?;
        stream.set_read_timeout(Some(Duration::from_secs(10)))?;
        Ok(Client {
            stream,
            no_ack: false,
        })
    }

    fn byte(&mut self) -> Result<u8> {
        let mut b = [0];
        self.stream.read_exact(&mut b).context("reading from server")?;
        Ok(b[0])
    }

    fn send(&mut self, body: &str) -> Result<()> {
        let checksum = body.bytes().fold(0u8, |a, b| a.wrapping_add(b));
        write!(self.stream, "${}#{:02x}", body, checksum)?;
        if !self.no_ack {
            let ack = self.byte()?;
            ensure!(ack == b'+', "expected ack for {:?}, got {:?}", body, ack as char);
        }
        Ok(())
    }

    fn recv(&mut self) -> Result<String> {
        let start = self.byte()?;
        ensure!(start == b'$', "expected packet start, got {:?}", start as char);

        let mut body = Vec::new();
        loop {
            match self.byte()? {
                b'#' => break,
                b => body.push(b),
            }
        }
        let checksum = [self.byte()?, self.byte()?];
        let expected = format!("{:02x}", body.iter().fold(0u8, |a, b| a.wrapping_add(*b)));
        ensure!(checksum == expected.as_bytes(), "bad checksum on reply");

        if !self.no_ack {
            self.stream.write_all(b"+")?;
        }
        Ok(String::from_utf8(body)?)
    }

    fn request(&mut self, body: &str) -> Result<String> {
        self.send(body)?;
        self.recv()
    }
}

#[test]
fn picorv32_session() -> Result<()> {
    let port = spawn_server("picorv32")?;
    let mut gdb = Client::connect(port)?;

    let features = gdb.request("qSupported:multiprocess+;swbreak+")?;
    ensure!(features.contains("QStartNoAckMode+"), "features: {}", features);
    assert_eq!(gdb.request("?")?, "S05");
    assert_eq!(gdb.request("p0")?, "00000000");

    let data = "000102030405060708090a0b0c0d0e0f";
    assert_eq!(gdb.request(&format!("M1000,10:{}", data))?, "OK");
    assert_eq!(gdb.request("m1000,10")?, data);

    // addi a0, zero, 42
    assert_eq!(gdb.request("M0,4:1305a002")?, "OK");
    assert_eq!(gdb.request("s")?, "S05");
    assert_eq!(gdb.request("pa")?, "2a000000");
    assert_eq!(gdb.request("p20")?, "04000000");

    // no matchpoints on this core
    assert_eq!(gdb.request("Z0,4,4")?, "");
    assert_eq!(gdb.request("m1fffe,4")?, "E0e");

    gdb.send("k")?;
    Ok(())
}

#[test]
fn ri5cy_breakpoint_and_interrupt() -> Result<()> {
    let port = spawn_server("RI5CY")?;
    let mut gdb = Client::connect(port)?;

    assert_eq!(gdb.request("QStartNoAckMode")?, "OK");
    gdb.no_ack = true;

    // 0x80: addi a0, a0, 1 ; 0x84: jal zero, -4
    assert_eq!(gdb.request("M80,8:130515006ff0dfff")?, "OK");
    assert_eq!(gdb.request("Z1,84,4")?, "OK");
    assert_eq!(gdb.request("c")?, "S05");
    assert_eq!(gdb.request("p20")?, "84000000");
    assert_eq!(gdb.request("z1,84,4")?, "OK");

    // spin until interrupted
    gdb.send("c")?;
    thread::sleep(Duration::from_millis(300));
    gdb.stream.write_all(&[0x03])?;
    assert_eq!(gdb.recv()?, "S02");

    let count = gdb.request("qRcmd,696e737472636f756e74")?;
    ensure!(count.starts_with('O'), "unexpected reply {:?}", count);
    assert_eq!(gdb.recv()?, "OK");

    assert_eq!(gdb.request("D")?, "OK");
    Ok(())
}

#[test]
fn server_keeps_listening_after_disconnect() -> Result<()> {
    let port = spawn_server("PicoRV32")?;

    let mut gdb = Client::connect(port)?;
    assert_eq!(gdb.request("P5=78563412")?, "OK");
    drop(gdb);

    // a dropped connection does not reset the target
    let mut gdb = Client::connect(port)?;
    assert_eq!(gdb.request("p5")?, "78563412");

    gdb.send("k")?;
    drop(gdb);

    // but a kill does
    let mut gdb = Client::connect(port)?;
    match gdb.request("p5")?.as_str() {
        "00000000" => Ok(()),
        other => bail!("register survived kill: {}", other),
    }
}
