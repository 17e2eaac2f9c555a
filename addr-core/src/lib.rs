//! # addr-core — Padronizador de Endereços Postais
//!
//! Este crate transforma linhas de endereço em texto livre em campos canônicos
//! (número, rua, tipo de via, cidade, código postal, unidade...), escolhendo a
//! melhor interpretação segundo uma gramática de regras ponderadas.
//!
//! ## Arquitetura do Sistema
//!
//! O dado flui em um pipeline linear:
//!
//! 1.  **Entrada**: linha micro (`123 Main St`) e, opcionalmente, macro (`Ottawa ON K1A 0B1`).
//! 2.  **Tokenização** ([`scanner`], [`tokenizer`]): morfos, frases do [`lexicon`] e
//!     reunificação de códigos postais, identificadores mistos e direções.
//! 3.  **Autômato Gamma** ([`gamma`]): as regras da gramática compiladas em um
//!     autômato de múltiplos padrões (estilo Aho-Corasick).
//! 4.  **Análise** ([`analyzer`]): busca recursiva na árvore de cláusulas sobre
//!     cada composição de definições, com lista ranqueada de [`candidates`].
//! 5.  **Saída** ([`export`]): [`StandardFields`] e renderizações XML/CSV/tela.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use addr_core::corpus;
//!
//! let standardizer = corpus::sample_standardizer().unwrap();
//! let mut ctx = standardizer.context();
//!
//! let fields = standardizer
//!     .standardize(&mut ctx, "123 Main St", Some("Ottawa ON K1A 0B1"))
//!     .unwrap();
//! assert_eq!(fields.house_num, "123");
//! assert_eq!(fields.suftype, "STREET");
//! assert_eq!(fields.postcode, "K1A 0B1");
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: orquestrador ([`Standardizer`]) com modos sync, streaming e lote.
//! - [`gamma`]: tabela de regras e autômato.
//! - [`analyzer`]: estados, transições, fallbacks e modo landmark.
//! - [`corpus`]: léxicos e gramática de exemplo.

pub mod analyzer;
pub mod candidates;
pub mod config;
pub mod corpus;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod gamma;
pub mod lexicon;
pub mod pipeline;
pub mod scanner;
pub mod symbols;
pub mod tokenizer;

pub use analyzer::{LandmarkField, State};
pub use config::StandardizerConfig;
pub use error::{BuildError, StandardizeError};
pub use export::{SerializationFormat, StandardFields};
pub use gamma::{RuleTable, RuleTableBuilder};
pub use lexicon::Lexicon;
pub use pipeline::{EvaluationContext, PipelineEvent, Standardizer};
pub use symbols::{ClauseType, InputSymbol, OutputSymbol};
