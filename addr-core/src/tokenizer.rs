//! # Tokenizador — Morfos, Lexemas e Reunificação
//!
//! Transforma o texto de um campo (micro ou macro) em um vetor de lexemas, cada
//! um com todas as suas definições candidatas.
//!
//! ## Etapas
//!
//! 1. **Varredura** ([`crate::scanner`]): morfos + terminadores.
//! 2. **Montagem de frases**: dentro de uma janela de até [`MAX_PHRASE`] morfos,
//!    procura no léxico a frase mais longa que começa no morfo base. Uma quebra
//!    forte (vírgula) encerra a frase.
//! 3. **Padrões**: sem entrada no léxico, o lexema é um único morfo com as
//!    definições padrão da sua classe.
//! 4. **Reunificação**: junta de volta o que a varredura separou.
//!
//! ```text
//! "K1A 0B1"  → K | 1 | A | 0 | B | 1      (morfos)
//!            → K1A {PCH, MIXED} | 0B1 {PCT, MIXED}
//! "12 N"     → 12 | N {SINGLE, DIRECT}    (letra de direção colada ao número)
//! "101-1750" → 101 {NUMBER, UNITT} | 1750 (unidade prefixada)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::StandardizeError;
use crate::lexicon::{DefaultKind, Definition, Lexicon};
use crate::scanner::{ScanItem, Scanner, Terminator};
use crate::symbols::InputSymbol;

/// Tamanho máximo (exclusivo) do texto de um morfo.
pub const MAX_TEXT: usize = 31;
/// Número máximo de morfos por campo.
pub const MAX_MORPHS: usize = 64;
/// Número máximo (exclusivo) de lexemas por campo.
pub const MAX_LEXEMES: usize = 64;
/// Tamanho da janela de busca de frases, em morfos.
pub const MAX_PHRASE: usize = 10;

const PRECEDES_ROUTE: &[InputSymbol] = &[InputSymbol::Type, InputSymbol::Qualifier, InputSymbol::Province];
const ROUTE: &[InputSymbol] = &[InputSymbol::RuralRoute, InputSymbol::Road];
const MIXED_COMPONENTS: &[InputSymbol] = &[InputSymbol::Number, InputSymbol::Word, InputSymbol::Single];
const POSTAL: &[InputSymbol] = &[InputSymbol::PostalTail, InputSymbol::PostalHead];
const PRECEDES_IDENTIFIER: &[InputSymbol] = &[
    InputSymbol::BoxHead,
    InputSymbol::Road,
    InputSymbol::UnitHead,
    InputSymbol::PreType,
    InputSymbol::BuildingHead,
    InputSymbol::RuralRoute,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Morph {
    pub text: String,
    pub kind: DefaultKind,
    pub term: Terminator,
}

/// Unidade reconhecida (possivelmente vários morfos) com suas definições.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexeme {
    pub start_morph: usize,
    pub end_morph: usize,
    pub text: String,
    pub definitions: Vec<Definition>,
}

impl Lexeme {
    pub fn has_symbol(&self, symbol: InputSymbol) -> bool {
        self.definitions.iter().any(|d| d.symbol == symbol)
    }

    pub fn has_any(&self, symbols: &[InputSymbol]) -> bool {
        self.definitions.iter().any(|d| symbols.contains(&d.symbol))
    }
}

/// Estado de tokenização de um campo. Reaproveitado entre chamadas.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    morphs: Vec<Morph>,
    lexemes: Vec<Lexeme>,
    base: usize,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            morphs: Vec::with_capacity(MAX_MORPHS + 1),
            lexemes: Vec::with_capacity(MAX_LEXEMES),
            base: 0,
        }
    }

    pub fn clear(&mut self) {
        self.morphs.clear();
        self.lexemes.clear();
        self.base = 0;
    }

    pub fn lexemes(&self) -> &[Lexeme] {
        &self.lexemes
    }

    /// Terminador do último morfo do lexema `index`.
    pub fn boundary(&self, index: usize) -> Terminator {
        self.morphs[self.lexemes[index].end_morph].term
    }

    /// Verdadeiro quando o lexema está colado ao seguinte.
    pub fn no_space(&self, index: usize) -> bool {
        self.boundary(index) == Terminator::Open
    }

    /// Tokeniza `input` consultando `lexicon`; devolve o número de lexemas.
    pub fn tokenize(&mut self, lexicon: &Lexicon, input: &str) -> Result<usize, StandardizeError> {
        self.clear();
        for item in Scanner::new(input) {
            match item {
                ScanItem::Morph { kind, text } => self.push_morph(lexicon, kind, text)?,
                ScanItem::Break(term) => self.set_term(term),
            }
        }
        while self.base < self.morphs.len() {
            let cur = self.morphs.len() - 1;
            self.base = self.process_lexeme(lexicon, cur, self.base)?;
        }
        Ok(self.lexemes.len())
    }

    fn push_morph(&mut self, lexicon: &Lexicon, kind: DefaultKind, text: String) -> Result<(), StandardizeError> {
        if text.len() >= MAX_TEXT {
            return Err(StandardizeError::TokenTooLong { text });
        }
        self.morphs.push(Morph {
            text,
            kind,
            term: Terminator::Open,
        });
        let cur = self.morphs.len() - 1;
        if cur == self.base + MAX_PHRASE - 1 {
            self.base = self.process_lexeme(lexicon, cur, self.base)?;
        }
        if self.morphs.len() > MAX_MORPHS {
            return Err(StandardizeError::TooManyMorphs);
        }
        Ok(())
    }

    fn set_term(&mut self, term: Terminator) {
        if let Some(last) = self.morphs.last_mut() {
            if last.term == Terminator::Open {
                last.term = term;
            }
        }
    }

    /// Junta os morfos `begin..=end` em uma frase. Para antes de atravessar uma
    /// quebra forte e devolve o último morfo efetivamente usado.
    fn phrase_from_morphs(&self, begin: usize, end: usize) -> (String, usize) {
        let mut phrase = self.morphs[begin].text.clone();
        for i in begin + 1..=end {
            let term = self.morphs[i - 1].term;
            if term == Terminator::Hard {
                return (phrase, i - 1);
            }
            if term.joins_with_space() {
                phrase.push(' ');
            }
            phrase.push_str(&self.morphs[i].text);
        }
        (phrase, end)
    }

    /// Monta um lexema a partir do morfo `base`, testando frases do mais longo
    /// (`cur`) ao mais curto. Devolve o próximo morfo não processado.
    fn process_lexeme(&mut self, lexicon: &Lexicon, cur: usize, base: usize) -> Result<usize, StandardizeError> {
        let mut ceiling = cur;
        let mut found = None;
        loop {
            let (phrase, clipped) = self.phrase_from_morphs(base, ceiling);
            ceiling = clipped;
            if let Some(entry) = lexicon.lookup(&phrase) {
                let rejected = ceiling > base
                    && base > 0
                    && phrase.starts_with("ST ")
                    && entry.definitions.iter().any(|d| ROUTE.contains(&d.symbol))
                    && self.lexemes.last().map_or(false, |prev| {
                        // "ST" como estado só vale depois de tipo, qualificador ou província
                        !prev.has_any(PRECEDES_ROUTE) && prev.has_symbol(InputSymbol::Number)
                    });
                if !rejected {
                    found = Some((phrase, entry.definitions.clone()));
                    break;
                }
            }
            if ceiling == base {
                break;
            }
            ceiling -= 1;
        }

        let (text, definitions, ceiling) = match found {
            Some((phrase, defs)) => (phrase, defs, ceiling),
            None => {
                let morph = &self.morphs[base];
                let mut text = morph.text.clone();
                if morph.kind == DefaultKind::Ordinal {
                    text.truncate(text.len().saturating_sub(2));
                }
                (text, morph.kind.definitions().to_vec(), base)
            }
        };

        if self.lexemes.len() >= MAX_LEXEMES {
            return Err(StandardizeError::TooManyLexemes { text });
        }
        self.lexemes.push(Lexeme {
            start_morph: base,
            end_morph: ceiling,
            text,
            definitions,
        });

        self.reunite_mixed();
        self.mark_hyphen_unit();
        Ok(ceiling + 1)
    }

    fn reunite_mixed(&mut self) {
        if self.is_zip() {
            return;
        }
        self.numeric_tail();
        self.fix_mixed();
    }

    /// Códigos ZIP americanos e códigos postais canadenses.
    fn is_zip(&mut self) -> bool {
        let n = self.lexemes.len() - 1;
        let cur = &self.lexemes[n];
        let len = cur.text.len();
        if cur.has_symbol(InputSymbol::Number) && len > 3 {
            if len > 6 || cur.text.starts_with(|c: char| c.is_ascii_alphabetic()) {
                return false;
            }
            let kind = if len == 4 { DefaultKind::ZipTail } else { DefaultKind::ZipHead };
            self.lexemes[n].definitions = kind.definitions().to_vec();
            return true;
        }

        if n < 2 || len != 1 {
            return false;
        }
        let first = cur.text.as_bytes()[0];
        let digit = if first.is_ascii_digit() {
            true
        } else if first.is_ascii_alphabetic() {
            false
        } else {
            return false;
        };
        if !self.no_space(n - 1) {
            return false;
        }
        // termina em dígito: é a segunda metade
        let kind = if digit { DefaultKind::PostalTail } else { DefaultKind::PostalHead };

        let prev = self.lexemes[n - 1].text.as_bytes();
        if self.lexemes[n - 1].has_symbol(InputSymbol::Mixed) {
            if prev.len() != 2 {
                return false;
            }
            let pattern = if digit {
                prev[0].is_ascii_digit() && prev[1].is_ascii_alphabetic()
            } else {
                prev[0].is_ascii_alphabetic() && prev[1].is_ascii_digit()
            };
            if !pattern {
                return false;
            }
            self.combine(kind);
            return true;
        }

        if prev.len() != 1 || (digit && !prev[0].is_ascii_alphabetic()) || (!digit && !prev[0].is_ascii_digit()) {
            return false;
        }
        let before = self.lexemes[n - 2].text.as_bytes();
        if before.len() != 1 || !self.no_space(n - 2) {
            return false;
        }
        if (digit && !before[0].is_ascii_digit()) || (!digit && !before[0].is_ascii_alphabetic()) {
            return false;
        }
        self.combine(kind);
        self.combine(kind);
        true
    }

    /// Letra N/S/E/W colada a um número vira direção.
    fn numeric_tail(&mut self) {
        let n = self.lexemes.len() - 1;
        if n < 1 || !self.lexemes[n - 1].has_symbol(InputSymbol::Number) {
            return;
        }
        if matches!(self.lexemes[n].text.as_str(), "N" | "S" | "E" | "W") && self.no_space(n - 1) {
            self.lexemes[n].definitions = DefaultKind::DirectionLetter.definitions().to_vec();
        }
    }

    /// Reúne identificadores alfanuméricos (`12A`, `B7`) separados pela varredura.
    fn fix_mixed(&mut self) {
        let n = self.lexemes.len() - 1;
        if n < 2 || !self.no_space(n - 1) || !self.lexemes[n].has_any(MIXED_COMPONENTS) {
            return;
        }
        let prev = &self.lexemes[n - 1];
        if prev.has_symbol(InputSymbol::Mixed) && !prev.has_any(POSTAL) {
            self.combine(DefaultKind::Mixed);
            return;
        }
        if !prev.has_any(MIXED_COMPONENTS) {
            return;
        }
        // uma via antes do identificador pode ser uma província
        if prev.has_symbol(InputSymbol::Road) && !prev.has_symbol(InputSymbol::Province) {
            return;
        }
        if !self.lexemes[n - 2].has_any(PRECEDES_IDENTIFIER) {
            return;
        }
        self.combine(DefaultKind::Mixed);
    }

    /// `101-1750`: o primeiro número, seguido de hífen, é uma unidade.
    fn mark_hyphen_unit(&mut self) {
        if self.lexemes.len() != 2 {
            return;
        }
        if !self.lexemes[0].has_symbol(InputSymbol::Number) || !self.lexemes[1].has_symbol(InputSymbol::Number) {
            return;
        }
        if self.boundary(0) == Terminator::Hyphen {
            self.lexemes[0].definitions = DefaultKind::Unit.definitions().to_vec();
        }
    }

    /// Funde o lexema atual ao anterior, trocando as definições do resultado.
    fn combine(&mut self, kind: DefaultKind) {
        let Some(cur) = self.lexemes.pop() else {
            return;
        };
        let Some(start) = self.lexemes.last().map(|prev| prev.start_morph) else {
            return;
        };
        let (text, _) = self.phrase_from_morphs(start, cur.end_morph);
        if let Some(prev) = self.lexemes.last_mut() {
            prev.end_morph = cur.end_morph;
            prev.text = text;
            prev.definitions = kind.definitions().to_vec();
        }
    }
}
