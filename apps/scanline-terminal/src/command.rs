//! Line-oriented operator commands.
//!
//! Anything that does not start with `:` is a barcode, which is what a
//! keyboard-wedge scanner types.

use anyhow::{anyhow, bail, Result};
use scanline_core::{Percentage, ScanMode};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Scan(String),
    Mode(ScanMode),
    Store(String),
    Refresh,
    Quantity { product_id: String, quantity: i64 },
    Discount { product_id: String, discount: Percentage },
    Retry,
    Cart,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  <barcode>                 add one unit (keyed or wedge scanner)
  :mode camera|manual       switch input mode
  :store <id>               switch active store
  :refresh                  reload the catalog and re-check the cart
  :qty <product> <n>        set line quantity (0 removes)
  :discount <product> <%>   set line discount
  :retry                    retry the camera after an error
  :cart                     show the cart
  :status                   show scanner and cache status
  :help                     this text
  :quit                     exit";

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(Some(Command::Scan(line.to_string())));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default().to_lowercase();
    let args: Vec<&str> = parts.collect();

    let command = match (name.as_str(), args.as_slice()) {
        ("mode", [mode]) => Command::Mode(mode.parse()?),
        ("store", [id]) => Command::Store(id.to_string()),
        ("refresh", []) => Command::Refresh,
        ("qty", [product_id, quantity]) => Command::Quantity {
            product_id: product_id.to_string(),
            quantity: quantity
                .parse()
                .map_err(|_| anyhow!("quantity must be a whole number"))?,
        },
        ("discount", [product_id, percent]) => {
            let percent: f64 = percent
                .trim_end_matches('%')
                .parse()
                .map_err(|_| anyhow!("discount must be a number"))?;
            Command::Discount {
                product_id: product_id.to_string(),
                discount: Percentage::from_percent(percent),
            }
        }
        ("retry", []) => Command::Retry,
        ("cart", []) => Command::Cart,
        ("status", []) => Command::Status,
        ("help", []) | ("h", []) => Command::Help,
        ("quit", []) | ("q", []) | ("exit", []) => Command::Quit,
        (other, _) => bail!("unknown command :{} (try :help)", other),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_lines_are_scans() {
        assert_eq!(
            parse("  4006381333931 \n").unwrap(),
            Some(Command::Scan("4006381333931".into()))
        );
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse(":mode manual").unwrap(),
            Some(Command::Mode(ScanMode::Manual))
        );
        assert_eq!(
            parse(":qty p1 3").unwrap(),
            Some(Command::Quantity {
                product_id: "p1".into(),
                quantity: 3
            })
        );
        assert_eq!(
            parse(":discount p1 12.5%").unwrap(),
            Some(Command::Discount {
                product_id: "p1".into(),
                discount: Percentage::from_bps(1250)
            })
        );
        assert_eq!(parse(":Q").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_bad_commands_are_errors() {
        assert!(parse(":mode laser").is_err());
        assert!(parse(":qty p1 many").is_err());
        assert!(parse(":store").is_err());
        assert!(parse(":launch").is_err());
    }
}
