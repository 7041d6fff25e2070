use anyhow::{Context, Result};
use awkit_core::config::{LoggerConfig, ToolConfig};
use awkit_core::Disassembler;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Format {
    /// assembly-like listing
    #[default]
    Text,
    /// labels and instructions as YAML
    Yaml,
}

/// Disassemble an extracted bytecode resource
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// bytecode file, e.g. `14_bytecode.bin`
    input: PathBuf,

    /// write the listing here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[arg(short, long)]
    verbose: bool,

    /// tool configuration (defaults to `awkit.toml` when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_logger(config: &LoggerConfig) {
    let directives = config.filter_directives(&["awkit_core", "disassembler"]);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(directives)).init();
}

fn render(bytecode: &[u8], format: Format) -> Result<String> {
    let disasm = Disassembler::new(bytecode)?;
    let text = match format {
        Format::Text => disasm.to_text(),
        Format::Yaml => serde_yaml::to_string(&disasm.to_listing())?,
    };
    Ok(text)
}

fn run(input: &Path, output: Option<&Path>, format: Format) -> Result<()> {
    let bytecode =
        std::fs::read(input).with_context(|| format!("unable to read {:?}", input))?;
    let text = render(&bytecode, format).with_context(|| format!("failed to disassemble {:?}", input))?;

    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("unable to write {:?}", path))?;
            log::info!("wrote disassembly to {:?}", path);
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = ToolConfig::load_or_default(args.config.as_deref())?;
    let logger_config = if args.verbose {
        LoggerConfig::verbose()
    } else {
        config.logger_config.clone()
    };
    init_logger(&logger_config);

    run(&args.input, args.output.as_deref(), args.format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use awkit_core::script::Listing;
    use pretty_assertions::assert_eq;

    const BYTECODE: &[u8] = &[
        0x07, 0x00, 0x04, // JUMP label_0004
        0x06, // YIELD
        0x0A, 0x80, 0x01, 0x02, 0x00, 0x03, // CJMP eq, [$01], [$02], label_0003
        0x05, // RET
    ];

    #[test]
    fn text_output() -> Result<()> {
        assert_eq!(
            render(BYTECODE, Format::Text)?,
            "    JUMP label_0004\n\
             label_0003:\n\
             \x20   YIELD\n\
             label_0004:\n\
             \x20   CJMP eq, [$01], [$02], label_0003\n\
             \x20   RET\n"
        );
        Ok(())
    }

    #[test]
    fn yaml_output_round_trips() -> Result<()> {
        let yaml = render(BYTECODE, Format::Yaml)?;
        let listing: Listing = serde_yaml::from_str(&yaml)?;
        assert_eq!(listing, Disassembler::new(BYTECODE)?.to_listing());
        assert_eq!(listing.insts[2].label.as_deref(), Some("label_0004"));
        assert_eq!(listing.insts[2].operands[3], "label_0003");
        assert_eq!(listing.insts[2].raw, "0a 80 01 02 00 03");
        Ok(())
    }

    #[test]
    fn writes_output_file() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("awkit-disassembler-{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        let input = dir.join("00_bytecode.bin");
        let output = dir.join("00_bytecode.asm");
        std::fs::write(&input, BYTECODE)?;

        run(&input, Some(&output), Format::Text)?;
        assert_eq!(std::fs::read_to_string(&output)?, render(BYTECODE, Format::Text)?);

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn truncated_input_is_reported() {
        let err = render(&[0x05, 0x04, 0x00], Format::Text).unwrap_err();
        assert!(err.to_string().contains("0x0001"), "{}", err);
    }
}
