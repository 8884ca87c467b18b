//! Operator control loop: one selected action at a time.
//!
//! Single task; card and modem operations never interleave. Every action
//! error is logged and aborts only that action.

use crate::card::{CardSession, TagReader};
use crate::error::{Result, StationError};
use crate::link::WifiLink;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, Lines};
use tokio::sync::watch;
use tracing::{info, warn};

/// Station glue: card session, wifi link, shutdown signal.
pub struct Station<R, S> {
    session: CardSession<R>,
    link: WifiLink<S>,
    shutdown: watch::Receiver<bool>,
}

impl<R, S> Station<R, S>
where
    R: TagReader,
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(session: CardSession<R>, link: WifiLink<S>, shutdown: watch::Receiver<bool>) -> Self {
        Self { session, link, shutdown }
    }

    /// Run until the console closes or the shutdown signal fires.
    pub async fn run<I>(&mut self, input: I) -> Result<()>
    where
        I: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        loop {
            if *self.shutdown.borrow() {
                break;
            }

            // The link gives no liveness signal between actions; probe it.
            if let Err(e) = self.link.ensure_alive().await {
                warn!("liveness check failed: {e}");
                println!("WiFi is down, actions will retry the link.");
            }

            print_menu();

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = self.shutdown.changed() => break,
            };
            let Some(line) = line else {
                break; // console closed
            };

            match line.trim().chars().next() {
                Some('1') => self.read_action().await,
                Some('2') => self.write_action(&mut lines).await,
                Some('3') => self.erase_action().await,
                _ => println!("Invalid selection!"),
            }
        }

        info!("control loop stopped");
        Ok(())
    }

    /// Read the tag and relay a non-empty product id to the API.
    async fn read_action(&mut self) {
        match self.session.read_product_id(&mut self.shutdown).await {
            Ok(id) if id.is_empty() => {}
            Ok(id) => {
                println!("Product read: {id}");
                if let Err(e) = self.link.post_product(&id).await {
                    warn!("API post failed: {e}");
                    println!("Could not reach the API.");
                }
            }
            Err(StationError::Cancelled) => {}
            Err(e) => {
                warn!("tag read failed: {e}");
                println!("Could not read the tag.");
            }
        }
    }

    /// Prompt for free text and store it on the tag.
    async fn write_action<I>(&mut self, lines: &mut Lines<I>)
    where
        I: AsyncBufRead + Unpin,
    {
        println!("Type the text to store (max 16 chars):");
        let text = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                _ => return,
            },
            _ = self.shutdown.changed() => return,
        };

        match self.session.write_text(text.trim(), &mut self.shutdown).await {
            Ok(()) => println!("Stored successfully!"),
            Err(StationError::Cancelled) => {}
            Err(e) => {
                warn!("tag write failed: {e}");
                println!("Could not write the tag.");
            }
        }
    }

    /// Zero the tag's product block.
    async fn erase_action(&mut self) {
        match self.session.erase_block(&mut self.shutdown).await {
            Ok(()) => println!("Block erased successfully!"),
            Err(StationError::Cancelled) => {}
            Err(e) => {
                warn!("tag erase failed: {e}");
                println!("Could not erase the tag.");
            }
        }
    }
}

fn print_menu() {
    println!("------------------------------------------");
    println!("--- Hello, select the desired operation --");
    println!("------------------------------------------");
    println!("| 1 ) Read product                       |");
    println!("| 2 ) Store product                      |");
    println!("| 3 ) Erase product                      |");
    println!("------------------------------------------");
    println!("Enter your selection: ");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::mock::MockReader;
    use crate::card::{BLOCK_LEN, encode_payload};
    use crate::config::{ApiConfig, WifiConfig};
    use crate::link::{AtChannel, LinkTiming};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
    use tokio::task::JoinHandle;

    /// Always-OK modem; returns everything it received once the station closes.
    fn spawn_ok_modem(mut stream: DuplexStream) -> JoinHandle<String> {
        tokio::spawn(async move {
            let mut transcript = Vec::new();
            let mut chunk = [0u8; 512];
            loop {
                match stream.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        transcript.extend_from_slice(&chunk[..n]);
                        if chunk[..n].contains(&b'\n') && stream.write_all(b"OK\r\n").await.is_err() {
                            break;
                        }
                    }
                }
            }
            String::from_utf8_lossy(&transcript).into_owned()
        })
    }

    fn fast_timing() -> LinkTiming {
        LinkTiming {
            command_wait: Duration::from_millis(10),
            join_window: Duration::from_millis(20),
            retry_delay: Duration::from_millis(5),
            probe_wait: Duration::from_millis(10),
            open_wait: Duration::from_millis(10),
            settle: Duration::from_millis(5),
        }
    }

    /// The sender must outlive the run; a dropped sender completes
    /// `changed()` and reads as a shutdown.
    fn station_with(
        reader: MockReader,
        stream: DuplexStream,
    ) -> (Station<MockReader, DuplexStream>, watch::Sender<bool>) {
        let session = CardSession::new(reader, 4);
        let link = WifiLink::new(AtChannel::new(stream), WifiConfig::default(), ApiConfig::default())
            .with_timing(fast_timing());
        let (tx, rx) = watch::channel(false);
        (Station::new(session, link, rx), tx)
    }

    #[tokio::test]
    async fn test_write_then_read_posts_exact_body() {
        let (station_side, modem_side) = duplex(4096);
        let modem = spawn_ok_modem(modem_side);

        let (mut station, _tx) = station_with(MockReader::with_card([0u8; BLOCK_LEN]), station_side);

        // Store "ABC123", then read it back; the read relays to the API.
        station.run(&b"2\nABC123\n1\n"[..]).await.unwrap();

        assert_eq!(&station.session.reader_mut().block[..6], b"ABC123");

        drop(station);
        let transcript = modem.await.unwrap();
        let body = "{\"locacao_id\":12,\"produto_id\":ABC123,\"qtde\":1}";
        assert!(transcript.contains(body));
        assert!(transcript.contains(&format!("Content-Length: {}\r\n\r\n{body}", body.len())));
    }

    #[tokio::test]
    async fn test_blank_tag_read_does_not_post() {
        let (station_side, modem_side) = duplex(4096);
        let modem = spawn_ok_modem(modem_side);

        let (mut station, _tx) = station_with(MockReader::with_card([0u8; BLOCK_LEN]), station_side);
        station.run(&b"1\n"[..]).await.unwrap();

        drop(station);
        let transcript = modem.await.unwrap();
        assert!(!transcript.contains("AT+CIPSTART"));
    }

    #[tokio::test]
    async fn test_invalid_selection_keeps_looping() {
        let (station_side, modem_side) = duplex(4096);
        let modem = spawn_ok_modem(modem_side);

        let (mut station, _tx) = station_with(MockReader::with_card(encode_payload("9")), station_side);
        // Garbage selection, then a real read.
        station.run(&b"x\n1\n"[..]).await.unwrap();

        drop(station);
        let transcript = modem.await.unwrap();
        assert!(transcript.contains("AT+CIPSTART"));
    }

    #[tokio::test]
    async fn test_erase_selection_zeroes_block() {
        let (station_side, modem_side) = duplex(4096);
        let modem = spawn_ok_modem(modem_side);

        let (mut station, _tx) = station_with(MockReader::with_card(encode_payload("OLD")), station_side);
        station.run(&b"3\n"[..]).await.unwrap();

        assert_eq!(station.session.reader_mut().block, [0u8; BLOCK_LEN]);

        drop(station);
        modem.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_loop() {
        let (station_side, modem_side) = duplex(4096);
        let modem = spawn_ok_modem(modem_side);

        let session = CardSession::new(MockReader::default(), 4);
        let link = WifiLink::new(AtChannel::new(station_side), WifiConfig::default(), ApiConfig::default())
            .with_timing(fast_timing());
        let (tx, rx) = watch::channel(false);
        let mut station = Station::new(session, link, rx);

        tx.send(true).unwrap();
        // Selection '1' would park waiting for a card that never arrives;
        // the shutdown flag has to win first.
        station.run(&b"1\n"[..]).await.unwrap();

        drop(station);
        modem.await.unwrap();
    }
}
