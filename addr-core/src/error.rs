//! # Erros
//!
//! Dois níveis de falha, com tratamentos distintos:
//!
//! - [`BuildError`]: fatal na construção. Uma regra ou linha de léxico inválida,
//!   ou uma capacidade excedida, aborta a montagem inteira do léxico ou da tabela
//!   de regras.
//! - [`StandardizeError`]: recuperável, restrito a uma chamada. O estado
//!   compartilhado (léxicos, autômato) continua válido.
//!
//! "Nenhum candidato encontrado" no modo landmark não é erro; é um resultado
//! negativo normal.

use thiserror::Error;

/// Falha fatal ao montar léxicos, tabela de regras ou configuração.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    /// Símbolo de entrada fora de `0..30`.
    #[error("rule {rule}: input symbol {symbol} out of range")]
    BadInputSymbol { rule: usize, symbol: i32 },

    /// Símbolo de saída fora de `0..18`.
    #[error("rule {rule}: output symbol {symbol} out of range")]
    BadOutputSymbol { rule: usize, symbol: i32 },

    /// Tipo de cláusula fora de `0..5`.
    #[error("rule {rule}: clause type {clause} out of range")]
    BadClauseType { rule: usize, clause: i32 },

    /// Rank de peso fora de `0..=17`.
    #[error("rule {rule}: weight rank {rank} out of range")]
    BadRank { rule: usize, rank: i32 },

    /// Regra sem símbolos de entrada ou de saída.
    #[error("rule {rule}: empty input or output sequence")]
    EmptyRule { rule: usize },

    /// Registro truncado ou com entrada e saída de tamanhos diferentes.
    #[error("rule {rule}: malformed record ({reason})")]
    MalformedRule { rule: usize, reason: String },

    #[error("too many rules (limit {limit})")]
    TooManyRules { limit: usize },

    /// O trie excedeu o limite de nós do autômato.
    #[error("too many automaton nodes (limit {limit})")]
    TooManyNodes { limit: usize },

    /// Linha de léxico mal formada (campos, sequência ou símbolo).
    #[error("lexicon line {line}: {reason}")]
    MalformedLexicon { line: usize, reason: String },

    /// JSON de configuração inválido.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Falha de uma única chamada; léxicos e autômato continuam válidos.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StandardizeError {
    /// Um morfo com 31 bytes ou mais.
    #[error("{text} is way too long")]
    TokenTooLong { text: String },

    /// Mais de 64 morfos no campo.
    #[error("too many morphemes in input")]
    TooManyMorphs,

    /// O lexema que ultrapassou o limite de lexemas.
    #[error("{text} is one too many lexemes")]
    TooManyLexemes { text: String },

    /// Nada sobrou depois da varredura (só separadores, por exemplo).
    #[error("no tokens in input")]
    EmptyInput,

    /// Nenhum candidato sobreviveu à avaliação.
    #[error("address failed to standardize")]
    NoStandardization,

    /// Índice pedido além da lista, ou igual ao último entregue.
    #[error("candidate {index} is not available")]
    NoSuchCandidate { index: usize },
}
