//! # Dados de Exemplo
//!
//! Um léxico de endereços, um gazetteer, um léxico de landmarks e uma
//! gramática pequena, suficientes para padronizar endereços norte-americanos
//! simples. Servem à CLI e aos testes de cenário.
//!
//! ## Formatos
//!
//! - Léxicos: `seq,palavra,símbolo,padrão` (veja [`Lexicon::parse_csv`]).
//! - Regras: `entrada… -1 saída… -1 cláusula rank`, uma por linha
//!   (veja [`RuleTableBuilder::parse`](crate::gamma::RuleTableBuilder::parse)).

use std::sync::Arc;

use crate::error::BuildError;
use crate::gamma::RuleTable;
use crate::lexicon::Lexicon;
use crate::pipeline::Standardizer;

/// Léxico de endereços (lado micro).
pub const ADDRESS_LEXICON: &str = "\
1,ST,2,STREET
2,ST,1,SAINT
1,STREET,2,STREET
1,AVE,2,AVENUE
1,AVENUE,2,AVENUE
1,RD,2,ROAD
1,ROAD,2,ROAD
1,BLVD,2,BOULEVARD
1,DR,2,DRIVE
1,LN,2,LANE
1,N,22,NORTH
1,NORTH,22,NORTH
1,S,22,SOUTH
1,SOUTH,22,SOUTH
1,E,22,EAST
1,EAST,22,EAST
1,W,22,WEST
1,WEST,22,WEST
1,OF,7,OF
1,THE,7,THE
1,PO BOX,14,PO BOX
1,BOX,14,PO BOX
1,RR,8,RR
1,APT,16,APT
1,UNIT,16,UNIT
1,SUITE,16,SUITE
1,#,16,#
1,FIRST,1,FIRST
2,FIRST,15,1ST
1,SECOND,1,SECOND
2,SECOND,15,2ND
";

/// Gazetteer (lado macro): cidades, estados e países.
pub const GAZETTEER: &str = "\
1,OTTAWA,10,OTTAWA
1,TORONTO,10,TORONTO
1,BOSTON,10,BOSTON
1,ON,11,ONTARIO
1,ONTARIO,11,ONTARIO
1,MA,11,MASSACHUSETTS
1,NY,11,NEW YORK
1,NEW YORK,11,NEW YORK
2,NEW YORK,10,NEW YORK
1,CANADA,12,CANADA
1,USA,12,USA
";

/// Léxico de pontos de interesse.
pub const LANDMARKS: &str = "\
1,PARK,2,PARK
1,MUSEUM,2,MUSEUM
1,HOSPITAL,2,HOSPITAL
1,MALL,2,MALL
";

/// Gramática de exemplo. Cláusulas: 0 MACRO, 1 MICRO, 2 ARC, 3 CIVIC, 4 EXTRA.
pub const RULES: &str = "
1 2 -1 5 6 -1 2 17
1 -1 5 -1 2 10
22 1 2 -1 2 5 6 -1 2 17
1 2 22 -1 5 6 7 -1 2 17
2 1 -1 4 5 -1 2 12
0 -1 1 -1 3 17
0 25 -1 1 1 -1 3 16
17 0 -1 17 1 -1 3 17
16 0 -1 16 17 -1 4 17
14 0 -1 14 15 -1 4 17
8 0 -1 8 8 -1 4 17
0 1 2 -1 1 5 6 -1 1 16
10 11 -1 10 11 -1 0 17
1 11 -1 10 11 -1 0 15
27 26 -1 13 13 -1 0 17
10 11 27 26 -1 10 11 13 13 -1 0 17
1 11 27 26 -1 10 11 13 13 -1 0 17
10 11 0 -1 10 11 13 -1 0 17
-1
";

pub fn address_lexicon() -> Result<Lexicon, BuildError> {
    Lexicon::parse_csv(ADDRESS_LEXICON)
}

pub fn gazetteer() -> Result<Lexicon, BuildError> {
    Lexicon::parse_csv(GAZETTEER)
}

pub fn landmark_lexicon() -> Result<Lexicon, BuildError> {
    Lexicon::parse_csv(LANDMARKS)
}

pub fn rule_table() -> Result<RuleTable, BuildError> {
    RuleTable::from_source(RULES)
}

/// Padronizador completo sobre os dados de exemplo.
pub fn sample_standardizer() -> Result<Standardizer, BuildError> {
    Ok(Standardizer::new(Arc::new(address_lexicon()?), Arc::new(rule_table()?))
        .with_gazetteer(Arc::new(gazetteer()?))
        .with_landmarks(Arc::new(landmark_lexicon()?)))
}

/// Endereços de demonstração: `(linha micro, linha macro)`.
pub fn demo_addresses() -> Vec<(&'static str, Option<&'static str>)> {
    vec![
        ("123 Main St", Some("Ottawa ON K1A 0B1")),
        ("101-1750 Main St", Some("Toronto ON")),
        ("007 First Ave Apt 5", None),
        ("12 N Elm Ave", Some("Boston MA 02134")),
        ("RR 2", Some("Ottawa ON")),
        ("PO Box 17", None),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::InputSymbol;

    #[test]
    fn test_sources_compile() {
        let lex = address_lexicon().unwrap();
        assert_eq!(lex.lookup("ST").unwrap().definitions.len(), 2);
        assert!(lex.lookup("FIRST").unwrap().has_symbol(InputSymbol::Ordinal));
        let rules = rule_table().unwrap();
        assert_eq!(rules.rule_count(), 18);
        assert!(gazetteer().unwrap().lookup("NEW YORK").unwrap().has_symbol(InputSymbol::City));
        assert_eq!(landmark_lexicon().unwrap().len(), 4);
    }

    #[test]
    fn test_demo_addresses_standardize() {
        let engine = sample_standardizer().unwrap();
        let mut ctx = engine.context();
        for (micro, macro_line) in demo_addresses() {
            let fields = engine.standardize(&mut ctx, micro, macro_line).unwrap();
            assert!(!fields.is_empty(), "{} produziu campos vazios", micro);
        }
    }
}
