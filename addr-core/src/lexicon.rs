//! # Léxico
//!
//! Tabela hash que mapeia o texto normalizado (maiúsculas) de uma palavra ou
//! frase para suas definições candidatas `(símbolo, texto canônico)`.
//!
//! ```text
//! "ST"  → [ TYPE  / "STREET",  WORD / "SAINT" ]
//! "AVE" → [ TYPE  / "AVENUE" ]
//! "N"   → [ DIRECT / "NORTH" ]
//! ```
//!
//! Uma palavra repetida na fonte acumula novas definições, exceto quando já
//! existe uma definição com o mesmo símbolo: nesse caso a inserção é ignorada
//! em silêncio.
//!
//! Lexemas sem entrada no léxico recebem as definições padrão da sua classe
//! ([`DefaultKind`]), que são "protegidas": não carregam texto canônico e a
//! exportação usa a grafia original.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::symbols::InputSymbol;

static NEXT_DEFINITION_ID: AtomicU64 = AtomicU64::new(1);

/// Identidade de uma definição. Cópias de uma mesma definição compartilham o id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DefinitionId(u64);

impl DefinitionId {
    fn next() -> Self {
        DefinitionId(NEXT_DEFINITION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Origem do texto padronizado de uma definição.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionSource {
    /// Texto canônico vindo do léxico.
    Lexicon(String),
    /// Definição padrão da classe: usa a grafia original.
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub id: DefinitionId,
    pub order: u32,
    pub symbol: InputSymbol,
    pub source: DefinitionSource,
}

impl Definition {
    pub fn from_lexicon(symbol: InputSymbol, text: &str, order: u32) -> Self {
        Self {
            id: DefinitionId::next(),
            order,
            symbol,
            source: DefinitionSource::Lexicon(text.to_string()),
        }
    }

    pub fn fallback(symbol: InputSymbol, order: u32) -> Self {
        Self {
            id: DefinitionId::next(),
            order,
            symbol,
            source: DefinitionSource::Default,
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self.source, DefinitionSource::Default)
    }

    /// Texto canônico, se a definição veio do léxico.
    pub fn standard_text(&self) -> Option<&str> {
        match &self.source {
            DefinitionSource::Lexicon(text) => Some(text),
            DefinitionSource::Default => None,
        }
    }
}

/// Classe de um morfo ou de um lexema montado, com suas definições padrão.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultKind {
    Fraction,
    Single,
    Double,
    Word,
    Number,
    Mixed,
    PostalHead,
    PostalTail,
    ZipHead,
    ZipTail,
    DirectionLetter,
    Ordinal,
    Unit,
}

impl DefaultKind {
    pub const COUNT: usize = 13;

    fn symbols(self) -> &'static [InputSymbol] {
        use InputSymbol as S;
        match self {
            DefaultKind::Fraction => &[S::Fraction],
            DefaultKind::Single => &[S::Single],
            DefaultKind::Double => &[S::Double],
            DefaultKind::Word => &[S::Word],
            DefaultKind::Number => &[S::Number],
            DefaultKind::Mixed => &[S::Mixed],
            DefaultKind::PostalHead => &[S::PostalHead, S::Mixed],
            DefaultKind::PostalTail => &[S::PostalTail, S::Mixed],
            DefaultKind::ZipHead => &[S::Number, S::ZipHead],
            DefaultKind::ZipTail => &[S::Number, S::ZipTail],
            DefaultKind::DirectionLetter => &[S::Single, S::Direction],
            DefaultKind::Ordinal => &[S::Word, S::Ordinal],
            // 101-1750 MAIN ST: número de unidade prefixado
            DefaultKind::Unit => &[S::Number, S::UnitTail],
        }
    }

    /// Definições padrão da classe (criadas uma vez por processo).
    pub fn definitions(self) -> &'static [Definition] {
        static TABLE: OnceLock<Vec<Vec<Definition>>> = OnceLock::new();
        let table = TABLE.get_or_init(|| {
            ALL_DEFAULT_KINDS
                .iter()
                .map(|kind| {
                    kind.symbols()
                        .iter()
                        .enumerate()
                        .map(|(order, sym)| Definition::fallback(*sym, order as u32))
                        .collect()
                })
                .collect()
        });
        &table[self as usize]
    }
}

const ALL_DEFAULT_KINDS: [DefaultKind; DefaultKind::COUNT] = [
    DefaultKind::Fraction,
    DefaultKind::Single,
    DefaultKind::Double,
    DefaultKind::Word,
    DefaultKind::Number,
    DefaultKind::Mixed,
    DefaultKind::PostalHead,
    DefaultKind::PostalTail,
    DefaultKind::ZipHead,
    DefaultKind::ZipTail,
    DefaultKind::DirectionLetter,
    DefaultKind::Ordinal,
    DefaultKind::Unit,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub lookup: String,
    pub definitions: Vec<Definition>,
}

impl LexiconEntry {
    pub fn has_symbol(&self, symbol: InputSymbol) -> bool {
        self.definitions.iter().any(|d| d.symbol == symbol)
    }
}

/// Uma linha da fonte de léxico/gazetteer: `seq, palavra, símbolo, padrão`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconRecord {
    pub seq: u32,
    pub lookup: String,
    pub symbol: i32,
    pub standard: String,
}

#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    entries: HashMap<String, LexiconEntry>,
}

/// Normaliza uma chave de busca: sem espaços nas pontas, em maiúsculas.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_uppercase()
}

impl Lexicon {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Acrescenta uma definição à entrada `key`.
    ///
    /// Retorna `false` (sem alterar nada) quando a entrada já tem uma definição
    /// com o mesmo símbolo.
    pub fn insert(&mut self, key: &str, symbol: InputSymbol, text: &str, order: u32) -> bool {
        let lookup = normalize_key(key);
        let entry = self
            .entries
            .entry(lookup.clone())
            .or_insert_with(|| LexiconEntry {
                lookup,
                definitions: Vec::new(),
            });
        if entry.has_symbol(symbol) {
            return false;
        }
        entry
            .definitions
            .push(Definition::from_lexicon(symbol, text, order));
        true
    }

    /// Insere um registro da fonte. `line` só entra nas mensagens de erro.
    pub fn add_record(&mut self, record: &LexiconRecord, line: usize) -> Result<bool, BuildError> {
        if record.seq == 0 {
            return Err(BuildError::MalformedLexicon {
                line,
                reason: "sequence numbers start at 1".to_string(),
            });
        }
        if record.lookup.trim().is_empty() {
            return Err(BuildError::MalformedLexicon {
                line,
                reason: "empty lookup word".to_string(),
            });
        }
        let symbol = InputSymbol::from_code(record.symbol).ok_or_else(|| BuildError::MalformedLexicon {
            line,
            reason: format!("bad token {}", record.symbol),
        })?;
        Ok(self.insert(&record.lookup, symbol, &record.standard, record.seq - 1))
    }

    /// Lê linhas `seq,palavra,símbolo,padrão`. Aspas e `\r` são ignorados e
    /// linhas vazias são puladas.
    pub fn parse_csv(source: &str) -> Result<Self, BuildError> {
        let mut lexicon = Self::new();
        for (i, raw) in source.lines().enumerate() {
            let line = i + 1;
            let cleaned: String = raw.chars().filter(|c| *c != '"' && *c != '\r').collect();
            if cleaned.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = cleaned.splitn(4, ',').map(str::trim).collect();
            if fields.len() != 4 {
                return Err(BuildError::MalformedLexicon {
                    line,
                    reason: format!("expected 4 fields, found {}", fields.len()),
                });
            }
            let seq = fields[0].parse::<u32>().map_err(|_| BuildError::MalformedLexicon {
                line,
                reason: format!("bad sequence number {:?}", fields[0]),
            })?;
            let symbol = fields[2].parse::<i32>().map_err(|_| BuildError::MalformedLexicon {
                line,
                reason: format!("bad token {:?}", fields[2]),
            })?;
            let record = LexiconRecord {
                seq,
                lookup: fields[1].to_string(),
                symbol,
                standard: fields[3].to_string(),
            };
            lexicon.add_record(&record, line)?;
        }
        Ok(lexicon)
    }

    /// Busca exata; a chave já deve estar normalizada.
    pub fn lookup(&self, key: &str) -> Option<&LexiconEntry> {
        self.entries.get(key)
    }

    /// Primeira definição de `key` com o texto canônico `standard`.
    pub fn find_definition(&self, key: &str, standard: &str) -> Option<&Definition> {
        self.lookup(&normalize_key(key))?
            .definitions
            .iter()
            .find(|d| d.standard_text() == Some(standard))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_accumulates_definitions() {
        let mut lex = Lexicon::new();
        assert!(lex.insert("st", InputSymbol::Type, "STREET", 0));
        assert!(lex.insert("ST", InputSymbol::Word, "SAINT", 1));
        let entry = lex.lookup("ST").unwrap();
        assert_eq!(entry.definitions.len(), 2);
        assert_eq!(entry.definitions[0].standard_text(), Some("STREET"));
        assert_eq!(entry.definitions[1].symbol, InputSymbol::Word);
    }

    #[test]
    fn test_insert_same_symbol_is_noop() {
        let mut lex = Lexicon::new();
        assert!(lex.insert("AVE", InputSymbol::Type, "AVENUE", 0));
        // Mesmo símbolo, texto diferente: ignorado em silêncio
        assert!(!lex.insert("AVE", InputSymbol::Type, "AV", 1));
        let entry = lex.lookup("AVE").unwrap();
        assert_eq!(entry.definitions.len(), 1);
        assert_eq!(entry.definitions[0].standard_text(), Some("AVENUE"));
    }

    #[test]
    fn test_parse_csv() {
        let src = "1,\"ST\",2,\"STREET\"\r\n2,\"ST\",1,\"SAINT\"\n\n1,\"N\",22,\"NORTH\"\n";
        let lex = Lexicon::parse_csv(src).unwrap();
        assert_eq!(lex.len(), 2);
        let st = lex.lookup("ST").unwrap();
        assert_eq!(st.definitions[1].order, 1);
        assert_eq!(lex.find_definition("n", "NORTH").map(|d| d.symbol), Some(InputSymbol::Direction));
    }

    #[test]
    fn test_parse_csv_rejects_bad_symbol() {
        let err = Lexicon::parse_csv("1,FOO,99,FOO").unwrap_err();
        assert!(matches!(err, BuildError::MalformedLexicon { line: 1, .. }));
        let err = Lexicon::parse_csv("1,FOO").unwrap_err();
        assert!(matches!(err, BuildError::MalformedLexicon { line: 1, .. }));
    }

    #[test]
    fn test_default_definitions_are_protected() {
        let defs = DefaultKind::PostalHead.definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].symbol, InputSymbol::PostalHead);
        assert_eq!(defs[1].symbol, InputSymbol::Mixed);
        assert!(defs.iter().all(Definition::is_protected));
        // Mesma identidade em chamadas repetidas
        assert_eq!(DefaultKind::PostalHead.definitions()[0].id, defs[0].id);
    }
}
