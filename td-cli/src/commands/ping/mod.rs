mod args;

pub use args::PingArgs;

use std::io::{Read, Write};

use anyhow::{Result, bail};
use td_model::protocol::PROMPT;

use crate::report::{Summary, print_summary};
use crate::session::{DriverSession, open_port};

/// Blank-line attempts before giving up
pub const PING_RETRIES: u32 = 30;

/// Reads per attempt
const READS_PER_ATTEMPT: u32 = 10;

pub fn handle_ping(args: PingArgs) -> Result<()> {
    let port = open_port(&args.port, args.baud)?;
    let mut session = DriverSession::new(port);
    let attempts = verify_alive(&mut session)?;
    print_summary(&Summary::Alive {
        port: &args.port,
        attempts,
    });
    Ok(())
}

/// Hit enter until the shell shows its prompt
///
/// # Returns
///
/// * `Ok(n)` - the prompt appeared after `n` attempts
/// * `Err` - no prompt after [`PING_RETRIES`] attempts
pub fn verify_alive<P: Read + Write>(session: &mut DriverSession<P>) -> Result<u32> {
    for attempt in 1..=PING_RETRIES {
        session.send("\n\n")?;
        for _ in 0..READS_PER_ATTEMPT {
            match session.read_line()? {
                Some(line) if line.contains(PROMPT) => return Ok(attempt),
                Some(_) => {}
                None => break,
            }
        }
        log::debug!("No prompt yet (attempt {attempt}/{PING_RETRIES})");
    }
    bail!("Test Driver is not responding")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePort;

    #[test]
    fn test_alive_on_first_attempt() {
        let mut session = DriverSession::new(FakePort::with_replies("\r\ntd>"));
        assert_eq!(verify_alive(&mut session).unwrap(), 1);
        assert_eq!(session.port().written_text(), "\n\n");
    }

    #[test]
    fn test_gives_up_after_retries() {
        let mut session = DriverSession::new(FakePort::default());
        let err = verify_alive(&mut session).unwrap_err();
        assert!(err.to_string().contains("not responding"));
        assert_eq!(
            session.port().written_text(),
            "\n\n".repeat(PING_RETRIES as usize)
        );
    }
}
