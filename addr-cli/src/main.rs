//! CLI do padronizador de endereços
//!
//! Lê um endereço por linha no formato `micro|macro` (a parte macro é
//! opcional) e imprime os campos padronizados.
//!
//! ```bash
//! echo '123 Main St|Ottawa ON K1A 0B1' | addr-std --format xml
//! addr-std --demo --stats
//! addr-std --landmark type --input pois.txt
//! ```

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use addr_core::{corpus, LandmarkField, SerializationFormat, StandardFields, StandardizerConfig};

#[derive(Parser, Debug)]
#[command(name = "addr-std")]
#[command(about = "Padroniza endereços postais linha a linha")]
struct Args {
    /// Arquivo de entrada (lê stdin se omitido)
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,

    /// Configuração JSON do padronizador
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Formato de saída (sobrepõe o da configuração)
    #[arg(long, short = 'f', value_enum)]
    format: Option<FormatArg>,

    /// Trata cada linha como um landmark do campo indicado
    #[arg(long, value_enum)]
    landmark: Option<LandmarkArg>,

    /// Imprime o relatório de uso das regras no fim
    #[arg(long)]
    stats: bool,

    /// Imprime os campos como JSON
    #[arg(long)]
    json: bool,

    /// Processa as linhas em paralelo
    #[arg(long)]
    parallel: bool,

    /// Usa os endereços de demonstração em vez da entrada
    #[arg(long)]
    demo: bool,

    /// Lista todos os candidatos de cada linha
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Xml,
    Csv,
    Screen,
    Plain,
}

impl From<FormatArg> for SerializationFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Xml => SerializationFormat::PseudoXml,
            FormatArg::Csv => SerializationFormat::PseudoCsv,
            FormatArg::Screen => SerializationFormat::Screen,
            FormatArg::Plain => SerializationFormat::NoFormat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LandmarkArg {
    Name,
    Type,
    Area,
}

impl From<LandmarkArg> for LandmarkField {
    fn from(arg: LandmarkArg) -> Self {
        match arg {
            LandmarkArg::Name => LandmarkField::Name,
            LandmarkArg::Type => LandmarkField::Type,
            LandmarkArg::Area => LandmarkField::Area,
        }
    }
}

fn load_config(args: &Args) -> Result<StandardizerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            StandardizerConfig::from_json(&source)?
        }
        None => StandardizerConfig::default(),
    };
    if args.stats {
        config.collect_statistics = true;
    }
    if let Some(format) = args.format {
        config.format = format.into();
    }
    Ok(config)
}

fn read_lines(args: &Args) -> Result<Vec<String>> {
    if args.demo {
        return Ok(corpus::demo_addresses()
            .into_iter()
            .map(|(micro, macro_line)| match macro_line {
                Some(m) => format!("{}|{}", micro, m),
                None => micro.to_string(),
            })
            .collect());
    }
    let text = match &args.input {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn split_line(line: &str) -> (String, Option<String>) {
    match line.split_once('|') {
        Some((micro, macro_line)) => (micro.trim().to_string(), Some(macro_line.trim().to_string())),
        None => (line.to_string(), None),
    }
}

fn print_fields(fields: &StandardFields, format: SerializationFormat, landmark: bool, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(fields)?);
    } else {
        print!("{}", fields.render(format, landmark));
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let format = config.format;
    let standardizer = corpus::sample_standardizer()?.with_config(config);
    let lines = read_lines(&args)?;
    info!(lines = lines.len(), "standardizer ready");

    let mut failures = 0usize;
    if args.parallel && args.landmark.is_none() {
        let pairs: Vec<(String, Option<String>)> = lines.iter().map(|l| split_line(l)).collect();
        for (line, result) in lines.iter().zip(standardizer.standardize_batch(&pairs)) {
            match result {
                Ok(fields) => print_fields(&fields, format, false, args.json)?,
                Err(err) => {
                    failures += 1;
                    warn!(%line, %err, "standardization failed");
                }
            }
        }
    } else {
        let mut ctx = standardizer.context();
        for line in &lines {
            let result = match args.landmark {
                Some(field) => standardizer.standardize_landmark(&mut ctx, line, field.into()),
                None => {
                    let (micro, macro_line) = split_line(line);
                    standardizer.standardize(&mut ctx, &micro, macro_line.as_deref()).map(Some)
                }
            };
            match result {
                Ok(Some(fields)) => print_fields(&fields, format, ctx.is_landmark(), args.json)?,
                Ok(None) => info!(%line, "no landmark candidate"),
                Err(err) => {
                    failures += 1;
                    warn!(%line, %err, "standardization failed");
                }
            }
            if args.debug {
                print!("{}", ctx.raw_elements());
            }
        }
        ctx.close();
    }

    if let Some(report) = standardizer.rule_statistics() {
        print!("{}", report);
    }
    info!(total = lines.len(), failures, "done");
    Ok(())
}
