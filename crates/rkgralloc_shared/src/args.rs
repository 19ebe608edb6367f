use crate::{FormatId, FormatModifiers, Usage};

/// Global arguments provided at process start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Path to lua config file
    pub config: Option<String>,
    /// Path to the log file. Logs go to stderr if absent
    pub log_file: Option<String>,
    /// DRM node to allocate from. System memory is used if absent
    pub device: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: FormatId,
    pub usage: Usage,
    pub modifiers: FormatModifiers,
    /// Perform an allocate/map/free cycle after printing the layout
    pub allocate: bool,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self {
            config: None,
            log_file: None,
            device: None,
            width: 1920,
            height: 1080,
            format: FormatId::RGBA_8888,
            usage: Usage::HW_TEXTURE | Usage::HW_RENDER,
            modifiers: FormatModifiers::empty(),
            allocate: false,
        }
    }
}

impl GlobalArgs {
    /// Parse global arguments. `None` indicates that the program should exit.
    ///
    /// The first item is the program name and is skipped.
    pub fn parse(args: impl Iterator<Item = String>) -> Option<Self> {
        let mut parsed = Self::default();
        let mut args = args.skip(1);

        while let Some(arg) = args.next() {
            let result = match arg.as_str() {
                "-h" | "--help" => {
                    print_help();
                    return None;
                }
                "--allocate" => {
                    parsed.allocate = true;
                    Ok(())
                }
                "--config" => value(&arg, args.next()).map(|v| parsed.config = Some(v)),
                "--log-file" => value(&arg, args.next()).map(|v| parsed.log_file = Some(v)),
                "--device" => value(&arg, args.next()).map(|v| parsed.device = Some(v)),
                "--width" => number32(&arg, args.next()).map(|v| parsed.width = v),
                "--height" => number32(&arg, args.next()).map(|v| parsed.height = v),
                "--format" => number32(&arg, args.next()).map(|v| parsed.format = FormatId(v)),
                "--usage" => number(&arg, args.next()).map(|v| parsed.usage = Usage::from_raw(v)),
                "--modifiers" => number(&arg, args.next())
                    .map(|v| parsed.modifiers = FormatModifiers::from_bits_retain(v)),
                _ => Err(format!("Unknown argument: {arg}")),
            };

            if let Err(message) = result {
                eprintln!("{message}");
                print_help();
                return None;
            }
        }

        Some(parsed)
    }
}

fn value(flag: &str, value: Option<String>) -> Result<String, String> {
    value.ok_or_else(|| format!("Missing value for {flag}"))
}

/// Accepts decimal and `0x` prefixed hexadecimal numbers.
fn number(flag: &str, value: Option<String>) -> Result<u64, String> {
    let value = value.ok_or_else(|| format!("Missing value for {flag}"))?;
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };

    parsed.map_err(|err| format!("Invalid number for {flag} ({value}): {err}"))
}

fn number32(flag: &str, value: Option<String>) -> Result<u32, String> {
    let value = number(flag, value)?;
    u32::try_from(value)
        .map_err(|_| format!("Value for {flag} does not fit in 32 bits: {value:#x}"))
}

fn print_help() {
    println!("Usage: rkgralloc [OPTIONS]");
    println!("Options:");
    println!("  --width <N>         Requested width in pixels (default 1920)");
    println!("  --height <N>        Requested height in pixels (default 1080)");
    println!("  --format <ID>       Requested format id, decimal or 0x hex (default RGBA_8888)");
    println!("  --usage <BITS>      Usage flags, decimal or 0x hex");
    println!("  --modifiers <BITS>  Extended format modifier bits, decimal or 0x hex");
    println!("  --allocate          Allocate, map and free a buffer with the computed layout");
    println!("  --device <PATH>     DRM node to allocate from instead of system memory");
    println!("  --config <PATH>     Path to gralloc.lua");
    println!("  --log-file <PATH>   Write logs to this file instead of stderr");
    println!("  -h, --help          Print this help message and exit");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Option<GlobalArgs> {
        GlobalArgs::parse(
            std::iter::once("rkgralloc")
                .chain(args.iter().copied())
                .map(String::from),
        )
    }

    #[test]
    fn no_arguments_yields_defaults() {
        assert_eq!(parse(&[]), Some(GlobalArgs::default()));
    }

    #[test]
    fn hex_and_decimal_values_are_accepted() {
        let args = parse(&[
            "--width", "256", "--height", "0x100", "--format", "0x101", "--usage", "0x903",
        ])
        .unwrap();

        assert_eq!(args.width, 256);
        assert_eq!(args.height, 256);
        assert_eq!(args.format, FormatId::NV12);
        assert!(args.usage.contains(Usage::HW_COMPOSER));
        assert!(args.usage.has_cpu_usage());
    }

    #[test]
    fn paths_and_switches_are_stored() {
        let args = parse(&[
            "--allocate",
            "--device",
            "/dev/dri/card0",
            "--log-file",
            "out.log",
            "--modifiers",
            "0x100000000",
        ])
        .unwrap();

        assert!(args.allocate);
        assert_eq!(args.device.as_deref(), Some("/dev/dri/card0"));
        assert_eq!(args.log_file.as_deref(), Some("out.log"));
        assert_eq!(args.modifiers, FormatModifiers::AFBC_BASIC);
    }

    #[test]
    fn help_and_bad_input_exit() {
        assert_eq!(parse(&["-h"]), None);
        assert_eq!(parse(&["--width"]), None);
        assert_eq!(parse(&["--width", "wide"]), None);
        assert_eq!(parse(&["--bogus"]), None);
    }

    #[test]
    fn values_wider_than_32_bits_are_rejected() {
        assert_eq!(parse(&["--width", "0x100000000"]), None);
        assert_eq!(parse(&["--height", "4294967296"]), None);
        assert_eq!(parse(&["--format", "0x100000101"]), None);
        assert_eq!(parse(&["--width", "0xffffffff"]).map(|a| a.width), Some(u32::MAX));
    }
}
