//! Web server command.

use console::style;

use crate::config::Settings;
use crate::server::AppState;

/// Default port when only a host is given.
const DEFAULT_PORT: u16 = 5000;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(&settings.bind)?;

    println!(
        "{} Loading credentials from {}",
        style("→").cyan(),
        settings.credentials_path.display()
    );
    let fuser = match super::build_fuser(settings) {
        Ok(fuser) => fuser,
        Err(e) => {
            eprintln!("  {} {}", style("✗").red(), e);
            return Err(e);
        }
    };
    println!("  {} Providers ready", style("✓").green());

    println!(
        "{} Starting geofuse server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(AppState::new(fuser), &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "5000" -> 127.0.0.1:5000
/// - Just a host: "0.0.0.0" -> 0.0.0.0:5000
/// - Host and port: "0.0.0.0:8080" -> 0.0.0.0:8080
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    let bind = bind.trim();
    if bind.is_empty() {
        anyhow::bail!("Empty bind address");
    }

    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
    }

    Ok((bind.to_string(), DEFAULT_PORT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_address() {
        assert_eq!(
            parse_bind_address("8080").unwrap(),
            ("127.0.0.1".to_string(), 8080)
        );
        assert_eq!(
            parse_bind_address("0.0.0.0").unwrap(),
            ("0.0.0.0".to_string(), 5000)
        );
        assert_eq!(
            parse_bind_address("0.0.0.0:3030").unwrap(),
            ("0.0.0.0".to_string(), 3030)
        );
        assert!(parse_bind_address("  ").is_err());
    }
}
