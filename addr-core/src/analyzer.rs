//! # Analisador — Busca na Árvore de Cláusulas
//!
//! Escolhe, entre todas as interpretações possíveis de um campo, as melhores
//! padronizações. Cada interpretação é uma *composição*: uma definição escolhida
//! para cada lexema.
//!
//! ## Por composição
//!
//! 1. **Alvo comprimido**: os símbolos de entrada da composição, com palavras
//!    consecutivas fundidas em uma só e stopwords absorvidas por um vizinho.
//!    `orig_pos[i]` guarda a posição do alvo que cobre o lexema `i`.
//! 2. **Registro**: o autômato Gamma percorre o alvo ([`RuleTable::fill_registry`]).
//! 3. **Varredura rasa** (MACRO, MICRO_B, EXTRA): só regras que cobrem o alvo
//!    inteiro contam.
//! 4. **Árvore de cláusulas** (demais estados): da direita para a esquerda, cada
//!    regra que termina na posição atual vira um segmento; a tabela de
//!    transição decide qual estado segue. Chegar ao início do alvo em `EXIT`
//!    deposita o caminho como candidato com score `Σ valores / (profundidade + 1)`.
//!
//! ## Transições
//!
//! | Estado  | MACRO_C | MICRO_C | ARC_C  | CIVIC_C | EXTRA_C |
//! |---------|---------|---------|--------|---------|---------|
//! | MICRO_B | -       | -       | EXIT   | -       | -       |
//! | MICRO_M | -       | EXIT    | PREFIX | -       | MICRO_M |
//! | MACRO   | EXIT    | -       | -      | -       | -       |
//! | PREFIX  | -       | -       | -      | EXIT    | -       |
//! | EXIT    | -       | -       | -      | -       | EXIT    |
//!
//! ## Fallbacks
//!
//! Sem candidato razoável, MICRO_B e MACRO forçam um único candidato de peso
//! baixo; MICRO_M recomeça em EXIT se a linha tiver rota rural ou caixa postal.
//! O modo landmark não usa o autômato: pontua cada composição diretamente.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::candidates::{BlockTable, Candidate, CandidateList};
use crate::config::StandardizerConfig;
use crate::gamma::{NodeId, RuleId, RuleTable};
use crate::lexicon::DefinitionId;
use crate::scanner::Terminator;
use crate::symbols::{load_value, ClauseType, InputSymbol, OutputSymbol, EXCELLENT_RANK, LOW_RANK};
use crate::tokenizer::{Lexeme, Tokenizer};

/// Definições consideradas por lexema ao enumerar composições.
pub const MAX_DEFINITIONS: usize = 8;
/// Valor de cada segmento de um candidato forçado.
pub const VERY_LOW_WEIGHT: f64 = 0.15;
/// Rank cujo valor encerra a busca depois de esgotar as composições.
const ACCEPTABLE_RANK: u8 = 1;

/// Campo de um landmark (ponto de interesse).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkField {
    Name,
    Type,
    Area,
}

impl LandmarkField {
    /// Símbolo que torna uma composição "excelente".
    pub fn desired_symbol(self) -> InputSymbol {
        match self {
            LandmarkField::Name | LandmarkField::Area => InputSymbol::Word,
            LandmarkField::Type => InputSymbol::Type,
        }
    }

    /// Campo de saída reaproveitado pelo landmark.
    pub fn output_symbol(self) -> OutputSymbol {
        match self {
            LandmarkField::Name => OutputSymbol::Building,
            LandmarkField::Type => OutputSymbol::RuralRoute,
            LandmarkField::Area => OutputSymbol::Extra,
        }
    }
}

/// Estado da gramática: onde a avaliação começa e como as cláusulas se aninham.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Linha de logradouro sem número.
    MicroB,
    /// Linha de endereço completa.
    MicroM,
    Macro,
    Prefix,
    Exit,
    /// Apenas regras EXTRA (unidade, caixa postal, rota rural).
    Extra,
    Landmark(LandmarkField),
}

type TransitionRow = [Option<State>; ClauseType::COUNT];

const TRANSITIONS: [TransitionRow; 5] = [
    // MICRO_B
    [None, None, Some(State::Exit), None, None],
    // MICRO_M
    [None, Some(State::Exit), Some(State::Prefix), None, Some(State::MicroM)],
    // MACRO
    [Some(State::Exit), None, None, None, None],
    // PREFIX
    [None, None, None, Some(State::Exit), None],
    // EXIT
    [None, None, None, None, Some(State::Exit)],
];

impl State {
    fn row(self) -> Option<usize> {
        match self {
            State::MicroB => Some(0),
            State::MicroM => Some(1),
            State::Macro => Some(2),
            State::Prefix => Some(3),
            State::Exit => Some(4),
            State::Extra | State::Landmark(_) => None,
        }
    }

    /// Estado seguinte ao casar uma regra da cláusula `clause`.
    pub fn transition(self, clause: ClauseType) -> Option<State> {
        self.row().and_then(|r| TRANSITIONS[r][clause.index()])
    }

    pub fn label(self) -> &'static str {
        match self {
            State::MicroB => "MICRO_B",
            State::MicroM => "MICRO_M",
            State::Macro => "MACRO",
            State::Prefix => "PREFIX",
            State::Exit => "EXIT",
            State::Extra => "EXTRA",
            State::Landmark(LandmarkField::Name) => "LANDMARK_NAME",
            State::Landmark(LandmarkField::Type) => "LANDMARK_TYPE",
            State::Landmark(LandmarkField::Area) => "LANDMARK_AREA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentOutput {
    Rule(RuleId),
    /// Um único símbolo para uma única posição (candidatos forçados).
    Singleton(OutputSymbol),
}

/// Um casamento pontuado dentro de um caminho da árvore de cláusulas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    pub state: State,
    pub output: SegmentOutput,
    pub value: f64,
}

/// Buffers de trabalho de uma avaliação. Reaproveitados entre chamadas.
#[derive(Debug, Clone, Default)]
pub struct Search {
    selection: Vec<usize>,
    def_counts: Vec<usize>,
    target: Vec<InputSymbol>,
    orig_pos: Vec<usize>,
    registry: Vec<NodeId>,
    segments: Vec<Segment>,
    candidates: CandidateList,
    best: Option<Candidate>,
}

impl Search {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.selection.clear();
        self.def_counts.clear();
        self.target.clear();
        self.orig_pos.clear();
        self.registry.clear();
        self.segments.clear();
        self.candidates.reset();
        self.best = None;
    }

    pub fn candidates(&self) -> &CandidateList {
        &self.candidates
    }

    /// Candidato entregue pela última seleção bem-sucedida.
    pub fn best(&self) -> Option<&Candidate> {
        self.best.as_ref()
    }

    /// Alvo comprimido da última composição preparada.
    pub fn target(&self) -> &[InputSymbol] {
        &self.target
    }

    pub fn downgrade(&self, index: usize) -> f64 {
        self.candidates.downgrade(index)
    }

    /// Avança para o candidato `request` (veja [`CandidateList::select`]).
    pub fn select(&mut self, request: usize, blocks: &BlockTable) -> bool {
        match self.candidates.select(request, blocks) {
            Some(candidate) => {
                self.best = Some(candidate.clone());
                true
            }
            None => false,
        }
    }

    fn first_composition(&mut self, lexemes: &[Lexeme]) {
        self.selection.clear();
        self.selection.resize(lexemes.len(), 0);
        self.def_counts.clear();
        self.def_counts
            .extend(lexemes.iter().map(|l| l.definitions.len().min(MAX_DEFINITIONS)));
    }

    /// Odômetro sobre as seleções, girando primeiro o último lexema.
    fn next_composition(&mut self) -> bool {
        for pos in (0..self.selection.len()).rev() {
            self.selection[pos] += 1;
            if self.selection[pos] < self.def_counts[pos] {
                return true;
            }
            self.selection[pos] = 0;
        }
        false
    }

    fn selected_symbol(&self, lexemes: &[Lexeme], i: usize) -> InputSymbol {
        lexemes[i].definitions[self.selection[i]].symbol
    }

    /// Monta o alvo comprimido da composição atual; devolve seu tamanho.
    fn prepare_target(&mut self, tokenizer: &Tokenizer, rules: &RuleTable) -> usize {
        let lexemes = tokenizer.lexemes();
        self.target.clear();
        self.orig_pos.clear();
        for i in 0..lexemes.len() {
            let symbol = self.selected_symbol(lexemes, i);
            let joins_left = self.target.last() == Some(&InputSymbol::Word)
                && i > 0
                && tokenizer.boundary(i - 1) != Terminator::Hard;
            match symbol {
                InputSymbol::Stopword | InputSymbol::Word if joins_left => {
                    self.orig_pos.push(self.target.len() - 1);
                }
                // stopword solta fica com o lexema seguinte
                InputSymbol::Stopword => self.orig_pos.push(self.target.len()),
                _ => {
                    self.orig_pos.push(self.target.len());
                    self.target.push(symbol);
                }
            }
        }
        if !self.target.is_empty() {
            rules.fill_registry(&self.target, &mut self.registry);
        }
        self.target.len()
    }

    /// `n` segmentos de uma posição cada, da direita (profundidade 0) para a esquerda.
    fn default_segments(&mut self, n: usize, reset: bool, symbol: OutputSymbol, value: f64) {
        self.segments.clear();
        for depth in 0..n {
            let pos = n - 1 - depth;
            if reset {
                self.selection[pos] = 0;
            }
            self.segments.push(Segment {
                start: pos,
                end: pos,
                state: State::Exit,
                output: SegmentOutput::Singleton(symbol),
                value,
            });
        }
    }

    /// Troca a saída do segmento `depth` se o lexema `pos` tiver uma definição `input`.
    fn modify_position(
        &mut self,
        lexemes: &[Lexeme],
        depth: usize,
        pos: usize,
        input: InputSymbol,
        output: OutputSymbol,
    ) -> bool {
        let found = lexemes[pos]
            .definitions
            .iter()
            .take(MAX_DEFINITIONS)
            .position(|d| d.symbol == input);
        match found {
            Some(j) => {
                self.segments[depth].output = SegmentOutput::Singleton(output);
                self.selection[pos] = j;
                true
            }
            None => false,
        }
    }

    /// Atribui `symbol` aos lexemas da posição de alvo que começa em `beg`.
    fn copy_best(
        &self,
        lexemes: &[Lexeme],
        outputs: &mut [Option<OutputSymbol>],
        symbol: OutputSymbol,
        beg: usize,
    ) -> usize {
        let n = lexemes.len();
        if beg >= n {
            return beg;
        }
        let next = self.orig_pos[beg] + 1;
        let mut lp = beg;
        while lp < n && self.orig_pos[lp] < next {
            let follows_street = lp > 0
                && symbol != OutputSymbol::Street
                && self.selected_symbol(lexemes, lp) == InputSymbol::Stopword
                && outputs[lp - 1] == Some(OutputSymbol::Street);
            outputs[lp] = Some(if follows_street { OutputSymbol::Street } else { symbol });
            lp += 1;
        }
        lp
    }

    /// Listagem de depuração das definições e de todos os candidatos.
    pub fn raw_elements(&self, lexemes: &[Lexeme]) -> String {
        let mut out = String::from("Input tokenization candidates:\n");
        for (i, lexeme) in lexemes.iter().enumerate() {
            for def in &lexeme.definitions {
                let _ = writeln!(
                    out,
                    "\t({}) std: {}, tok: {} ({})",
                    i,
                    def.standard_text().unwrap_or(&lexeme.text),
                    def.symbol.index(),
                    def.symbol.label()
                );
            }
        }
        for (k, candidate) in self.candidates.iter().enumerate() {
            let _ = writeln!(out, "Raw standardization {} with score {:.6}:", k, candidate.score);
            for (i, lexeme) in lexemes.iter().enumerate() {
                let Some(def) = candidate.selection.get(i).and_then(|s| lexeme.definitions.get(*s)) else {
                    break;
                };
                match candidate.outputs.get(i).copied().flatten() {
                    Some(output) => {
                        let _ = writeln!(
                            out,
                            "\t({}) Input {} ({}) text {} mapped to output {} ({})",
                            i,
                            def.symbol.index(),
                            def.symbol.label(),
                            lexeme.text,
                            output.index(),
                            output.label()
                        );
                    }
                    None => {
                        let _ = writeln!(
                            out,
                            "\t({}) Input {} ({}) text {} mapped to output -1 (NONE)",
                            i,
                            def.symbol.index(),
                            def.symbol.label(),
                            lexeme.text
                        );
                        break;
                    }
                }
            }
        }
        out
    }
}

/// Avaliador sobre uma tabela de regras compilada. Não guarda estado próprio:
/// tudo o que muda fica em [`Search`].
pub struct Analyzer<'a> {
    rules: &'a RuleTable,
    blocks: &'a BlockTable,
    config: &'a StandardizerConfig,
}

impl<'a> Analyzer<'a> {
    pub fn new(rules: &'a RuleTable, blocks: &'a BlockTable, config: &'a StandardizerConfig) -> Self {
        Self { rules, blocks, config }
    }

    /// Avalia os lexemas do tokenizador a partir de `start` e seleciona o
    /// melhor candidato. Falso quando nenhum candidato sobrevive.
    pub fn evaluate(&self, tokenizer: &Tokenizer, search: &mut Search, start: State) -> bool {
        search.reset();
        let lexemes = tokenizer.lexemes();
        if lexemes.is_empty() {
            return false;
        }
        if let State::Landmark(field) = start {
            return self.evaluate_landmark(lexemes, search, field);
        }

        let excellent = load_value(EXCELLENT_RANK);
        let mut state = start;
        loop {
            search.first_composition(lexemes);
            loop {
                let len = search.prepare_target(tokenizer, self.rules);
                if len > 0 {
                    search.segments.clear();
                    match state {
                        State::Macro => self.shallow_scan(search, lexemes, state, ClauseType::Macro, len),
                        State::MicroB => self.shallow_scan(search, lexemes, state, ClauseType::Arc, len),
                        State::Extra => self.shallow_scan(search, lexemes, state, ClauseType::Extra, len),
                        _ => self.scan_clause_tree(search, lexemes, state, len, 0, 0.0),
                    }
                    if !self.config.analyze_complete
                        && !search.candidates.is_empty()
                        && search.candidates.best_score() >= excellent
                    {
                        break;
                    }
                }
                if !search.next_composition() {
                    break;
                }
            }

            if search.candidates.best_score() >= load_value(ACCEPTABLE_RANK) {
                break;
            }
            match state {
                State::MicroB => {
                    debug!("no arc standardization found, forcing one");
                    self.force_arc(search, lexemes);
                    break;
                }
                State::Macro => {
                    debug!("no macro standardization found, forcing one");
                    self.force_macro(search, lexemes);
                    break;
                }
                State::MicroM if is_non_geocode(lexemes) => {
                    debug!("rural route or box address, restarting in EXIT");
                    state = State::Exit;
                }
                _ => break,
            }
        }
        self.select_first(search)
    }

    fn select_first(&self, search: &mut Search) -> bool {
        let dropped = search.candidates.purge(self.blocks);
        if dropped > 0 {
            debug!(dropped, "blocked or duplicate candidates removed");
        }
        if !search.select(0, self.blocks) {
            return false;
        }
        if let Some(best) = search.best.as_ref() {
            for id in &best.rules {
                self.rules.record_best(*id);
            }
        }
        true
    }

    fn scan_clause_tree(
        &self,
        search: &mut Search,
        lexemes: &[Lexeme],
        state: State,
        pos: usize,
        depth: usize,
        sum: f64,
    ) {
        let node = search.registry[pos];
        for clause in ClauseType::all() {
            let Some(next) = state.transition(*clause) else {
                continue;
            };
            for &id in self.rules.rules_at(node, *clause) {
                let rule = self.rules.rule(id);
                let len = rule.len();
                // cobrir o alvo inteiro só vale se a cláusula leva a EXIT
                if len > pos || (len == pos && next != State::Exit) {
                    continue;
                }
                self.rules.record_hit(id);
                let value = rule.value();
                let start = pos - len;
                search.segments.push(Segment {
                    start,
                    end: pos - 1,
                    state,
                    output: SegmentOutput::Rule(id),
                    value,
                });
                if start == 0 {
                    self.deposit(search, lexemes, depth, sum + value);
                } else {
                    self.scan_clause_tree(search, lexemes, next, start, depth + 1, sum + value);
                }
                search.segments.pop();
            }
        }
    }

    /// Deposita toda regra da cláusula que cobre exatamente `pos` posições.
    fn shallow_scan(&self, search: &mut Search, lexemes: &[Lexeme], state: State, clause: ClauseType, pos: usize) {
        let node = search.registry[pos];
        for &id in self.rules.rules_at(node, clause) {
            let rule = self.rules.rule(id);
            // a lista vai da regra mais longa para a mais curta
            if rule.len() < pos {
                return;
            }
            self.rules.record_hit(id);
            let value = load_value(rule.rank);
            search.segments.clear();
            search.segments.push(Segment {
                start: 0,
                end: pos - 1,
                state,
                output: SegmentOutput::Rule(id),
                value,
            });
            self.deposit(search, lexemes, 0, value);
        }
    }

    fn deposit(&self, search: &mut Search, lexemes: &[Lexeme], depth: usize, sum: f64) {
        let score = sum / (depth + 1) as f64;
        if !search.candidates.admits(score) {
            return;
        }
        let candidate = self.save_composition(search, lexemes, score);
        if let Some(pos) = search.candidates.insert(candidate) {
            debug!(score, pos, depth, "candidate deposited");
        }
    }

    /// Descomprime o caminho atual em um candidato por lexema.
    fn save_composition(&self, search: &Search, lexemes: &[Lexeme], score: f64) -> Candidate {
        let n = lexemes.len();
        let mut outputs = vec![None; n];
        let mut rules = Vec::new();
        let mut lex_pos = 0;
        for segment in search.segments.iter().rev() {
            match segment.output {
                SegmentOutput::Rule(id) => {
                    rules.push(id);
                    for symbol in &self.rules.rule(id).output {
                        lex_pos = search.copy_best(lexemes, &mut outputs, *symbol, lex_pos);
                    }
                }
                SegmentOutput::Singleton(symbol) => {
                    lex_pos = search.copy_best(lexemes, &mut outputs, symbol, lex_pos);
                }
            }
        }
        let definitions: Vec<DefinitionId> = lexemes
            .iter()
            .zip(&search.selection)
            .map(|(lexeme, sel)| lexeme.definitions[*sel].id)
            .collect();
        Candidate {
            score,
            raw_score: score,
            outputs,
            definitions,
            selection: search.selection.clone(),
            rules,
        }
    }

    /// Deposita os segmentos unitários atuais, sem compressão.
    fn force_deposit(&self, search: &mut Search, lexemes: &[Lexeme]) {
        let n = lexemes.len();
        search.orig_pos.clear();
        search.orig_pos.extend(0..n);
        let sum: f64 = search.segments.iter().map(|s| s.value).sum();
        self.deposit(search, lexemes, n - 1, sum);
    }

    /// Tudo vira STREET, exceto direções e tipos nas pontas permitidos pela
    /// configuração.
    fn force_arc(&self, search: &mut Search, lexemes: &[Lexeme]) {
        let n = lexemes.len();
        search.default_segments(n, true, OutputSymbol::Street, VERY_LOW_WEIGHT);
        let allows = |s| self.config.has_reference_attribute(s);
        let (mut start, mut end) = (0, n - 1);

        let mut depth = 0;
        if start + 1 < end
            && allows(OutputSymbol::SufDirection)
            && search.modify_position(lexemes, depth, end, InputSymbol::Direction, OutputSymbol::SufDirection)
        {
            end -= 1;
            depth += 1;
        }
        if start + 1 < end
            && allows(OutputSymbol::SufType)
            && search.modify_position(lexemes, depth, end, InputSymbol::Type, OutputSymbol::SufType)
        {
            end -= 1;
        }

        depth = n - 1;
        if start + 1 < end
            && allows(OutputSymbol::PreDirection)
            && search.modify_position(lexemes, depth, start, InputSymbol::Direction, OutputSymbol::PreDirection)
        {
            start += 1;
            depth -= 1;
        }
        if start + 1 < end
            && allows(OutputSymbol::PreType)
            && search.modify_position(lexemes, depth, start, InputSymbol::Type, OutputSymbol::PreType)
        {
            start += 1;
        }
        debug!(start, end, "forced arc candidate");
        self.force_deposit(search, lexemes);
    }

    /// Cada lexema recebe o campo macro do seu primeiro símbolo reconhecível.
    fn force_macro(&self, search: &mut Search, lexemes: &[Lexeme]) {
        const MACRO_FALLBACK: [(InputSymbol, OutputSymbol); 10] = [
            (InputSymbol::PostalHead, OutputSymbol::Postal),
            (InputSymbol::PostalTail, OutputSymbol::Postal),
            (InputSymbol::ZipHead, OutputSymbol::Postal),
            (InputSymbol::ZipTail, OutputSymbol::Postal),
            (InputSymbol::Number, OutputSymbol::Postal),
            (InputSymbol::Mixed, OutputSymbol::Postal),
            (InputSymbol::Nation, OutputSymbol::Nation),
            (InputSymbol::Province, OutputSymbol::Province),
            (InputSymbol::City, OutputSymbol::City),
            (InputSymbol::Word, OutputSymbol::City),
        ];
        let n = lexemes.len();
        search.default_segments(n, false, OutputSymbol::Postal, VERY_LOW_WEIGHT);
        for pos in 0..n {
            let depth = n - 1 - pos;
            for (input, output) in MACRO_FALLBACK {
                if search.modify_position(lexemes, depth, pos, input, output) {
                    break;
                }
            }
        }
        self.force_deposit(search, lexemes);
    }

    fn evaluate_landmark(&self, lexemes: &[Lexeme], search: &mut Search, field: LandmarkField) -> bool {
        let desired = field.desired_symbol();
        let output = field.output_symbol();
        let n = lexemes.len();
        search.first_composition(lexemes);
        loop {
            let marked = (0..n).all(|i| {
                let def = &lexemes[i].definitions[search.selection[i]];
                def.symbol == desired || def.is_protected()
            });
            let rank = if marked { EXCELLENT_RANK } else { LOW_RANK };
            search.default_segments(n, false, output, load_value(rank));
            self.force_deposit(search, lexemes);
            if !search.next_composition() {
                break;
            }
        }
        self.select_first(search)
    }
}

/// Linhas de rota rural ou caixa postal, que não têm geocódigo de rua.
fn is_non_geocode(lexemes: &[Lexeme]) -> bool {
    lexemes
        .iter()
        .any(|l| l.has_any(&[InputSymbol::RuralRoute, InputSymbol::BoxHead]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus;
    use crate::lexicon::Lexicon;

    struct Fixture {
        lexicon: Lexicon,
        rules: RuleTable,
        blocks: BlockTable,
        config: StandardizerConfig,
    }

    fn fixture() -> Fixture {
        let lexicon = corpus::address_lexicon().unwrap();
        let blocks = BlockTable::install(&lexicon);
        Fixture {
            lexicon,
            rules: corpus::rule_table().unwrap(),
            blocks,
            config: StandardizerConfig::default(),
        }
    }

    fn run(fx: &Fixture, lexicon: &Lexicon, text: &str, state: State) -> (Tokenizer, Search, bool) {
        let mut tok = Tokenizer::new();
        tok.tokenize(lexicon, text).unwrap();
        let mut search = Search::new();
        let ok = Analyzer::new(&fx.rules, &fx.blocks, &fx.config).evaluate(&tok, &mut search, state);
        (tok, search, ok)
    }

    fn outputs(search: &Search) -> Vec<Option<OutputSymbol>> {
        search.best().unwrap().outputs.clone()
    }

    #[test]
    fn test_transition_table() {
        assert_eq!(State::MicroM.transition(ClauseType::Arc), Some(State::Prefix));
        assert_eq!(State::MicroM.transition(ClauseType::Extra), Some(State::MicroM));
        assert_eq!(State::Prefix.transition(ClauseType::Civic), Some(State::Exit));
        assert_eq!(State::Prefix.transition(ClauseType::Arc), None);
        assert_eq!(State::Macro.transition(ClauseType::Micro), None);
        assert_eq!(State::Extra.transition(ClauseType::Extra), None);
    }

    #[test]
    fn test_target_compression() {
        let fx = fixture();
        let mut tok = Tokenizer::new();
        let mut search = Search::new();

        tok.tokenize(&fx.lexicon, "12 Elm Ave").unwrap();
        search.first_composition(tok.lexemes());
        assert_eq!(search.prepare_target(&tok, &fx.rules), 3);
        assert_eq!(search.orig_pos, vec![0, 1, 2]);

        // palavras seguidas viram um só WORD; a vírgula impede a junção
        tok.tokenize(&fx.lexicon, "12 Elm Oak Ave").unwrap();
        search.first_composition(tok.lexemes());
        assert_eq!(search.prepare_target(&tok, &fx.rules), 3);
        assert_eq!(search.orig_pos, vec![0, 1, 1, 2]);
        assert_eq!(search.target(), &[InputSymbol::Number, InputSymbol::Word, InputSymbol::Type]);

        tok.tokenize(&fx.lexicon, "Elm, Oak").unwrap();
        search.first_composition(tok.lexemes());
        assert_eq!(search.prepare_target(&tok, &fx.rules), 2);
    }

    #[test]
    fn test_micro_street_type_beats_saint() {
        let fx = fixture();
        let (tok, mut search, ok) = run(&fx, &fx.lexicon, "123 Main St", State::MicroM);
        assert!(ok);
        assert_eq!(
            outputs(&search),
            vec![Some(OutputSymbol::House), Some(OutputSymbol::Street), Some(OutputSymbol::SufType)]
        );
        let best = search.best().unwrap();
        assert_eq!(best.definitions[2], fx.lexicon.find_definition("ST", "STREET").unwrap().id);
        // regra MICRO inteira: 0.95 * 0.95
        assert!((best.score - 0.9025).abs() < 1e-9);

        // o caminho ARC + CIVIC com a mesma saída é duplicata e some
        assert!(search.select(1, &fx.blocks));
        let second = search.best().unwrap();
        assert_eq!(second.definitions[2], fx.lexicon.find_definition("ST", "SAINT").unwrap().id);
        assert_eq!(second.outputs[2], Some(OutputSymbol::Street));
        assert!(search.downgrade(1) < 1.0);
        assert!(search.raw_elements(tok.lexemes()).contains("Raw standardization 0 with score 0.902500"));
    }

    #[test]
    fn test_candidates_sorted_and_unique() {
        let fx = fixture();
        let (_, mut search, _) = run(&fx, &fx.lexicon, "123 Main St Apt 5", State::MicroM);
        let mut i = 1;
        while search.select(i, &fx.blocks) {
            i += 1;
        }
        let list: Vec<&Candidate> = search.candidates().iter().collect();
        for pair in list.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for (a, first) in list.iter().enumerate() {
            for second in &list[a + 1..] {
                assert!(!first.same_standardization(second));
            }
        }
        assert!(list.iter().all(|c| !fx.blocks.is_blocked(c)));
    }

    #[test]
    fn test_unit_extra_clause() {
        let fx = fixture();
        let (_, search, ok) = run(&fx, &fx.lexicon, "123 Main St Apt 5", State::MicroM);
        assert!(ok);
        assert_eq!(
            outputs(&search),
            vec![
                Some(OutputSymbol::House),
                Some(OutputSymbol::Street),
                Some(OutputSymbol::SufType),
                Some(OutputSymbol::UnitHead),
                Some(OutputSymbol::UnitTail),
            ]
        );
    }

    #[test]
    fn test_blocked_pretype_is_skipped() {
        let mut fx = fixture();
        fx.config.analyze_complete = true;
        let (_, search, ok) = run(&fx, &fx.lexicon, "St Mary", State::MicroB);
        assert!(ok);
        let best = search.best().unwrap();
        assert_eq!(best.outputs, vec![Some(OutputSymbol::Street), Some(OutputSymbol::Street)]);
        assert_eq!(best.definitions[0], fx.lexicon.find_definition("ST", "SAINT").unwrap().id);
    }

    #[test]
    fn test_forced_arc_is_single_candidate() {
        let fx = fixture();
        let (_, search, ok) = run(&fx, &fx.lexicon, "123", State::MicroB);
        assert!(ok);
        assert_eq!(search.candidates().len(), 1);
        let best = search.best().unwrap();
        assert_eq!(best.outputs, vec![Some(OutputSymbol::Street)]);
        assert!((best.score - VERY_LOW_WEIGHT).abs() < 1e-9);
    }

    #[test]
    fn test_forced_arc_uses_reference_attributes() {
        let mut fx = fixture();
        fx.config.reference_attributes = vec![OutputSymbol::PreDirection, OutputSymbol::SufType];
        let (_, search, ok) = run(&fx, &fx.lexicon, "N 99 77 Ave", State::MicroB);
        assert!(ok);
        assert_eq!(
            outputs(&search),
            vec![
                Some(OutputSymbol::PreDirection),
                Some(OutputSymbol::Street),
                Some(OutputSymbol::Street),
                Some(OutputSymbol::SufType),
            ]
        );
        assert_eq!(search.candidates().len(), 1);
    }

    #[test]
    fn test_macro_with_postal_code() {
        let fx = fixture();
        let gazetteer = corpus::gazetteer().unwrap();
        let (_, search, ok) = run(&fx, &gazetteer, "Ottawa ON K1A 0B1", State::Macro);
        assert!(ok);
        assert_eq!(
            outputs(&search),
            vec![
                Some(OutputSymbol::City),
                Some(OutputSymbol::Province),
                Some(OutputSymbol::Postal),
                Some(OutputSymbol::Postal),
            ]
        );
        assert_eq!(search.best().unwrap().score, 1.0);
    }

    #[test]
    fn test_forced_macro() {
        let fx = fixture();
        let gazetteer = corpus::gazetteer().unwrap();
        let (_, search, ok) = run(&fx, &gazetteer, "Maple K1A 0B1", State::Macro);
        assert!(ok);
        assert_eq!(
            outputs(&search),
            vec![Some(OutputSymbol::City), Some(OutputSymbol::Postal), Some(OutputSymbol::Postal)]
        );
    }

    #[test]
    fn test_rural_route_restarts_in_exit() {
        let fx = fixture();
        let (_, search, ok) = run(&fx, &fx.lexicon, "RR 2", State::MicroM);
        assert!(ok);
        assert_eq!(
            outputs(&search),
            vec![Some(OutputSymbol::RuralRoute), Some(OutputSymbol::RuralRoute)]
        );
    }

    #[test]
    fn test_landmark_scoring() {
        let fx = fixture();
        let poi = corpus::landmark_lexicon().unwrap();
        let (_, search, ok) = run(&fx, &poi, "Central Park", State::Landmark(LandmarkField::Type));
        assert!(ok);
        let best = search.best().unwrap();
        assert_eq!(best.outputs, vec![Some(OutputSymbol::RuralRoute); 2]);
        assert!((best.score - 0.95).abs() < 1e-9);

        let (_, search, _) = run(&fx, &poi, "Central Park", State::Landmark(LandmarkField::Name));
        assert!((search.best().unwrap().score - 0.375).abs() < 1e-9);
    }

    #[test]
    fn test_statistics_counters() {
        let fx = fixture();
        fx.rules.set_collect_statistics(true);
        run(&fx, &fx.lexicon, "123 Main St", State::MicroM);
        let report = fx.rules.statistics_report().unwrap();
        assert!(report.total_hits >= 3);
        assert!(report.total_best >= 1);
    }
}
