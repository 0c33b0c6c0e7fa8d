use std::{
    collections::HashMap,
    fmt::{Debug, Display},
    hash::Hash,
};

use tracing::debug;

use crate::{Grammar, NonTerminal, Production, Symbol, error::Error};

/// LR(0) 项.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Item<'a> {
    /// 项对应的产生式.
    prod: &'a Production<'a>,
    /// dot 所处的位置, 在 `0..=prod.len()` 范围中, 产生式中的 epsilon 不算长度.
    dot: usize,
}

impl Debug for Item<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tail_s: String = self
            .prod
            .tail_without_eps()
            .enumerate()
            .map(|(i, t)| format!("{}{:?} ", if i == self.dot { "⋅ " } else { "" }, t))
            .collect();
        f.pad(&format!(
            "Item({:?} -> {})",
            self.prod.head(),
            format!(
                "{}{}",
                tail_s.trim_end(),
                if self.dot == self.prod.len() {
                    " ⋅"
                } else {
                    ""
                }
            )
            .trim()
        ))
    }
}

impl Display for Item<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tail_s: String = self
            .prod
            .tail_without_eps()
            .enumerate()
            .map(|(i, t)| format!("{}{} ", if i == self.dot { "⋅ " } else { "" }, t))
            .collect();
        f.pad(&format!(
            "{} -> {}",
            self.prod.head(),
            format!(
                "{}{}",
                tail_s.trim_end(),
                if self.dot == self.prod.len() {
                    " ⋅"
                } else {
                    ""
                }
            )
            .trim()
        ))
    }
}

impl<'a> Item<'a> {
    #[must_use]
    pub(crate) fn new(prod: &'a Production<'a>, dot: usize) -> Self {
        Self { prod, dot }
    }

    /// dot 在产生式尾部最前面的项, 空产生式的初始项即为可规约项.
    #[must_use]
    pub(crate) fn initial(prod: &'a Production<'a>) -> Self {
        Self { prod, dot: 0 }
    }

    /// dot 之后期望的符号, 可规约项返回 [`None`].
    #[must_use]
    pub fn expected(&self) -> Option<Symbol<'a>> {
        self.prod.tail_without_eps().nth(self.dot).copied()
    }

    /// dot 之后恰好是 `sym` 时返回 dot 后移一位的项.
    #[must_use]
    pub fn advanced(&self, sym: Symbol<'a>) -> Option<Self> {
        if self.expected()? != sym {
            None?
        }
        Some(Self::new(self.prod, self.dot + 1))
    }

    #[must_use]
    pub fn is_reducible(&self) -> bool {
        self.dot == self.prod.len()
    }

    #[must_use]
    pub fn prod(&self) -> &'a Production<'a> {
        self.prod
    }
}

/// LR(0) 项集.
///
/// 项按加入顺序保存 (内核项在前, 闭包项按产生式编号顺序在后),
/// 这样项集族的状态编号在每次构建中都一致;
/// 相等性和 hash 则使用排序后的视图, 与加入顺序无关.
#[derive(Clone)]
pub struct ItemSet<'a> {
    grammar: &'a Grammar<'a>,
    items: Vec<Item<'a>>,
}

impl Debug for ItemSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemSet")
            .field("items", &self.items)
            .finish()
    }
}

impl PartialEq for ItemSet<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.sorted_items() == other.sorted_items()
    }
}

impl Eq for ItemSet<'_> {}

impl Hash for ItemSet<'_> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.sorted_items().hash(state);
    }
}

impl<'a> ItemSet<'a> {
    /// 获取 I_0 项集.
    ///
    /// `grammar` 需要是已经增广的文法.
    ///
    /// 如果 grammar 的 [`Grammar::symbol_start`] 的产生式不恰好是一个,
    /// 那么返回 [`Error::GrammarNotAugmented`].
    pub(crate) fn initial(grammar: &'a Grammar<'a>) -> Result<Self, Error> {
        let start_prods = grammar.prods_of(grammar.symbol_start());
        if start_prods.len() != 1 {
            Err(Error::GrammarNotAugmented)?
        }
        Ok(Self {
            grammar,
            items: vec![Item::initial(start_prods[0])],
        }
        .closure())
    }

    fn sorted_items(&self) -> Vec<Item<'a>> {
        let mut items = self.items.clone();
        items.sort();
        items
    }

    /// 获取当前项集的闭包项集, 闭包项按产生式编号顺序追加, 幂等.
    #[must_use]
    pub(crate) fn closure(mut self) -> Self {
        loop {
            let mut wanted: Vec<NonTerminal<'a>> = Vec::new();
            for item in &self.items {
                if let Some(Symbol::NonTerminal(nt)) = item.expected()
                    && !wanted.contains(&nt)
                {
                    wanted.push(nt);
                }
            }
            let mut added = false;
            for &prod in self.grammar.prods() {
                if !wanted.contains(&prod.head()) {
                    continue;
                }
                let item = Item::initial(prod);
                if !self.items.contains(&item) {
                    self.items.push(item);
                    added = true;
                }
            }
            if !added {
                break;
            }
        }
        self
    }

    /// GOTO(self, sym): dot 越过 `sym` 的项集的闭包, 没有项可以移动时返回 [`None`].
    #[must_use]
    pub(crate) fn goto(&self, sym: Symbol<'a>) -> Option<Self> {
        let items: Vec<Item<'a>> = self.items.iter().filter_map(|i| i.advanced(sym)).collect();
        if items.is_empty() {
            None
        } else {
            Some(
                Self {
                    grammar: self.grammar,
                    items,
                }
                .closure(),
            )
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &Item<'a>> {
        self.items.iter()
    }

    /// dot 之后出现过的符号, 按项顺序去重, 决定出边的枚举顺序.
    #[must_use]
    pub fn dot_symbols(&self) -> Vec<Symbol<'a>> {
        let mut syms: Vec<Symbol<'a>> = Vec::new();
        for item in &self.items {
            if let Some(sym) = item.expected()
                && !syms.contains(&sym)
            {
                syms.push(sym);
            }
        }
        syms
    }

    pub fn reduce_items(&self) -> impl Iterator<Item = &Item<'a>> {
        self.items.iter().filter(|i| i.is_reducible())
    }
}

/// LR(0) 项集族, 即识别活前缀的 DFA.
#[derive(Debug)]
pub struct Automaton<'a> {
    states: Vec<&'a ItemSet<'a>>,
    /// 每个状态的出边, 按 [`ItemSet::dot_symbols`] 顺序排列.
    transitions: Vec<Vec<(Symbol<'a>, usize)>>,
}

impl<'a> Automaton<'a> {
    /// 从增广文法广度优先构建项集族, 状态按发现顺序编号, I_0 为初始闭包.
    ///
    /// 同一个文法 (相同的产生式顺序) 构建出的编号始终一致.
    pub fn from_grammar(grammar: &'a Grammar<'a>) -> Result<Self, Error> {
        let bump = grammar.bump();
        let i0 = &*bump.alloc(ItemSet::initial(grammar)?);
        #[allow(clippy::mutable_key_type)]
        let mut state_idxes: HashMap<&'a ItemSet<'a>, usize> = HashMap::new();
        let mut states = vec![i0];
        state_idxes.insert(i0, 0);
        let mut transitions: Vec<Vec<(Symbol<'a>, usize)>> = Vec::new();
        let mut cursor = 0;
        while cursor < states.len() {
            let is = states[cursor];
            let mut edges = Vec::new();
            for sym in is.dot_symbols() {
                // dot_symbols 保证 goto 非空.
                let Some(next) = is.goto(sym) else {
                    continue;
                };
                let next = &*bump.alloc(next);
                let to = *state_idxes.entry(next).or_insert_with(|| {
                    states.push(next);
                    states.len() - 1
                });
                debug!("GOTO(I_{cursor}, {sym}) = I_{to}");
                edges.push((sym, to));
            }
            transitions.push(edges);
            cursor += 1;
        }
        Ok(Self {
            states,
            transitions,
        })
    }

    /// 按照 I_i (i = 0, 1, 2, 3...) 顺序获取项集.
    #[must_use]
    pub fn states(&self) -> &[&'a ItemSet<'a>] {
        &self.states
    }

    /// 一个状态的出边, 状态不存在时为空.
    #[must_use]
    pub fn transitions_of(&self, state: usize) -> &[(Symbol<'a>, usize)] {
        self.transitions.get(state).map_or(&[], Vec::as_slice)
    }

    /// 获取项集族数量.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use bumpalo::Bump;

    use crate::{
        Automaton, Grammar, NonTerminal, Symbol, Terminal,
        error::Error,
        item::{Item, ItemSet},
    };
    use pretty_assertions::assert_eq;

    fn classic_grammar(bump: &Bump) -> Grammar<'_> {
        Grammar::from_cfg(
            "E -> E + T | T
            T -> T * F | F
            F -> ( E ) | id",
            "E".into(),
            bump,
        )
        .unwrap()
        .augmented()
    }

    #[test]
    fn closure_of_initial_state() {
        let bump = Bump::new();
        let grammar = classic_grammar(&bump);
        let i0 = ItemSet::initial(&grammar).unwrap();
        // 内核项在前, 闭包项按产生式编号顺序在后.
        let expected: Vec<Item<'_>> = grammar.prods().iter().map(|&p| Item::initial(p)).collect();
        assert_eq!(i0.items, expected);
    }

    #[test]
    fn closure_is_idempotent() {
        let bump = Bump::new();
        let grammar = classic_grammar(&bump);
        let i0 = ItemSet::initial(&grammar).unwrap();
        let closed = i0.clone().closure();
        assert_eq!(closed, i0);
        assert_eq!(closed.items, i0.items);
    }

    #[test]
    fn set_equality_ignores_item_order() {
        let bump = Bump::new();
        let grammar = classic_grammar(&bump);
        let i0 = ItemSet::initial(&grammar).unwrap();
        let mut reversed = i0.clone();
        reversed.items.reverse();
        assert_eq!(reversed, i0);
    }

    #[test]
    fn goto_advances_kernel() {
        let bump = Bump::new();
        let grammar = classic_grammar(&bump);
        let i0 = ItemSet::initial(&grammar).unwrap();
        let e = Symbol::from(NonTerminal::from("E"));
        let next = i0.goto(e).unwrap();
        // E' -> E ⋅ 与 E -> E ⋅ + T, 无新的闭包项.
        assert_eq!(
            next.items,
            vec![
                Item::new(grammar.prods()[0], 1),
                Item::new(grammar.prods()[1], 1),
            ]
        );
        assert!(next.items[0].is_reducible());
        assert_eq!(
            next.items[1].expected(),
            Some(Terminal::from("+").into())
        );
        assert_eq!(i0.goto(Terminal::from("x").into()), None);
    }

    #[test]
    fn initial_demands_augmented_grammar() {
        let bump = Bump::new();
        let grammar = Grammar::from_cfg("E -> E + T | T\nT -> id", "E".into(), &bump).unwrap();
        assert_eq!(
            ItemSet::initial(&grammar).unwrap_err(),
            Error::GrammarNotAugmented
        );
    }

    #[test]
    fn epsilon_item_is_reducible_at_dot_zero() {
        let bump = Bump::new();
        let grammar = Grammar::from_cfg("S -> A\nA -> #", "S".into(), &bump)
            .unwrap()
            .augmented();
        let i0 = ItemSet::initial(&grammar).unwrap();
        let eps_item = Item::initial(grammar.prods()[2]);
        assert!(i0.items.contains(&eps_item));
        assert!(eps_item.is_reducible());
        assert_eq!(eps_item.expected(), None);
        assert_eq!(format!("{eps_item}"), "A -> ⋅");
    }

    #[test]
    fn automaton_of_classic_grammar() {
        let bump = Bump::new();
        let grammar = classic_grammar(&bump);
        let automaton = Automaton::from_grammar(&grammar).unwrap();
        assert_eq!(automaton.len(), 12);

        let e = Symbol::from(NonTerminal::from("E"));
        let t = Symbol::from(NonTerminal::from("T"));
        let f = Symbol::from(NonTerminal::from("F"));
        let plus = Symbol::from(Terminal::from("+"));
        let star = Symbol::from(Terminal::from("*"));
        let paren_open = Symbol::from(Terminal::from("("));
        let paren_close = Symbol::from(Terminal::from(")"));
        let id = Symbol::from(Terminal::from("id"));

        assert_eq!(
            automaton.transitions_of(0),
            [(e, 1), (t, 2), (f, 3), (paren_open, 4), (id, 5)]
        );
        assert_eq!(automaton.transitions_of(1), [(plus, 6)]);
        assert_eq!(automaton.transitions_of(2), [(star, 7)]);
        assert!(automaton.transitions_of(3).is_empty());
        assert_eq!(
            automaton.transitions_of(4),
            [(e, 8), (t, 2), (f, 3), (paren_open, 4), (id, 5)]
        );
        assert!(automaton.transitions_of(5).is_empty());
        assert_eq!(
            automaton.transitions_of(6),
            [(t, 9), (f, 3), (paren_open, 4), (id, 5)]
        );
        assert_eq!(
            automaton.transitions_of(7),
            [(f, 10), (paren_open, 4), (id, 5)]
        );
        // 状态 8 的内核是 [F -> ( E ⋅ ), E -> E ⋅ + T], 出边按这个顺序.
        assert_eq!(
            automaton.transitions_of(8),
            [(paren_close, 11), (plus, 6)]
        );
        assert_eq!(automaton.transitions_of(9), [(star, 7)]);
        assert!(automaton.transitions_of(10).is_empty());
        assert!(automaton.transitions_of(11).is_empty());

        // 状态 1 是接受前状态: E' -> E ⋅.
        let kernel: Vec<_> = automaton.states()[1].items().copied().collect();
        assert_eq!(kernel[0], Item::new(grammar.prods()[0], 1));
    }

    #[test]
    fn every_state_is_reachable() {
        let bump = Bump::new();
        let grammar = classic_grammar(&bump);
        let automaton = Automaton::from_grammar(&grammar).unwrap();
        let mut reached = vec![false; automaton.len()];
        reached[0] = true;
        for state in 0..automaton.len() {
            for &(_, to) in automaton.transitions_of(state) {
                assert!(to < automaton.len());
                reached[to] = true;
            }
        }
        assert!(reached.iter().all(|&r| r));
    }

    #[test]
    fn numbering_is_deterministic() {
        let build = || {
            let bump = Bump::new();
            let grammar = classic_grammar(&bump);
            let automaton = Automaton::from_grammar(&grammar).unwrap();
            let states: Vec<Vec<String>> = automaton
                .states()
                .iter()
                .map(|is| is.items().map(|i| format!("{i}")).collect())
                .collect();
            let transitions: Vec<Vec<(String, usize)>> = (0..automaton.len())
                .map(|s| {
                    automaton
                        .transitions_of(s)
                        .iter()
                        .map(|&(sym, to)| (sym.as_str().to_string(), to))
                        .collect()
                })
                .collect();
            (states, transitions)
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn dot_symbols_in_first_appearance_order() {
        let bump = Bump::new();
        let grammar = classic_grammar(&bump);
        let i0 = ItemSet::initial(&grammar).unwrap();
        let syms: Vec<&str> = i0.dot_symbols().iter().map(Symbol::as_str).collect();
        assert_eq!(syms, ["E", "T", "F", "(", "id"]);
    }

    #[test]
    fn automaton_reuses_discovered_states() {
        let bump = Bump::new();
        // a 与 b 之后都要识别 x -> c, 项集 { x -> c ⋅ } 只编号一次.
        let grammar = Grammar::from_cfg("S -> a x | b x\nx -> c", "S".into(), &bump)
            .unwrap()
            .augmented();
        let automaton = Automaton::from_grammar(&grammar).unwrap();
        assert_eq!(automaton.len(), 7);
        let x = Symbol::from(NonTerminal::from("x"));
        let c = Symbol::from(Terminal::from("c"));
        assert_eq!(automaton.transitions_of(2), [(x, 4), (c, 5)]);
        assert_eq!(automaton.transitions_of(3), [(x, 6), (c, 5)]);
    }
}
