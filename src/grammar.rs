use bumpalo::Bump;
use std::{
    collections::{BTreeSet, HashMap, HashSet, hash_map::Entry},
    fmt::{Debug, Display},
};

use crate::{
    NonTerminal, Symbol, Terminal,
    error::{Error, ParseProductionError},
    symbol::{EOF, EPSILON},
};

#[derive(Clone, Hash, PartialOrd, Ord)]
pub struct Production<'a> {
    // 产生式 `->` 左侧内容.
    head: NonTerminal<'a>,
    // 产生式 `->` 右侧内容.
    tail: Vec<Symbol<'a>>,
}

impl Debug for Production<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Production")
            .field(&format_args!(
                "{:?} -> {}",
                self.head,
                self.tail
                    .iter()
                    .map(|t| format!("{:?} ", t))
                    .collect::<String>()
                    .trim_end()
            ))
            .finish()
    }
}

impl Display for Production<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&format!(
            "{} -> {}",
            self.head,
            self.tail
                .iter()
                .map(|t| format!("{} ", t))
                .collect::<String>()
                .trim_end()
        ))
    }
}

impl PartialEq for Production<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.head == other.head && self.tail == other.tail
    }
}

impl Eq for Production<'_> {}

impl<'a> Production<'a> {
    #[must_use]
    pub fn new(head: NonTerminal<'a>, tail: Vec<Symbol<'a>>) -> Self {
        Self { head, tail }
    }

    #[must_use]
    pub fn head(&self) -> NonTerminal<'a> {
        self.head
    }

    #[must_use]
    pub fn tail(&self) -> &[Symbol<'a>] {
        &self.tail
    }

    pub fn tail_without_eps(&self) -> impl Iterator<Item = &Symbol<'a>> {
        self.tail
            .iter()
            .filter(|sym| !matches!(sym, Symbol::Terminal(EPSILON)))
    }

    /// 产生式尾部的符号数量, [`EPSILON`] 不算长度.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tail_without_eps().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct Grammar<'a> {
    bump: &'a Bump,
    prods: Vec<&'a Production<'a>>,
    prod_indexes: HashMap<&'a Production<'a>, usize>,
    /// 文法符号, 按首次出现顺序排列: 逐条产生式先头部后尾部, [`EOF`] 恒为最后.
    /// 项集的出边和分析表的列都沿用这个顺序.
    symbols: Vec<Symbol<'a>>,
    symbol_names: HashMap<&'a str, Symbol<'a>>,
    start: NonTerminal<'a>,
    /// 各非终结符的 first 集, 创建文法时由不动点迭代一次算出.
    first_sets: HashMap<NonTerminal<'a>, BTreeSet<Terminal<'a>>>,
    /// 可以推导出空串的非终结符.
    nullable: HashSet<NonTerminal<'a>>,
    /// 各非终结符的 follow 集, 只在增广文法上有意义, [`Grammar::augmented`] 之前为空.
    follow_sets: HashMap<NonTerminal<'a>, BTreeSet<Terminal<'a>>>,
}

impl PartialEq for Grammar<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.prods == other.prods && self.start == other.start && self.symbols == other.symbols
    }
}

impl Eq for Grammar<'_> {}

impl<'a> Grammar<'a> {
    #[must_use]
    pub(crate) fn bump(&self) -> &'a Bump {
        self.bump
    }

    /// 按产生式编号遍历产生式.
    pub fn prods(&self) -> &[&'a Production<'a>] {
        &self.prods
    }

    /// 获取产生式的编号, 如果产生式在文法中不存在, 那么返回 [`None`].
    #[must_use]
    pub fn index_of_prod(&self, prod: &Production<'a>) -> Option<usize> {
        self.prod_indexes.get(prod).copied()
    }

    #[must_use]
    pub fn symbol_start(&self) -> NonTerminal<'a> {
        self.start
    }

    #[must_use]
    pub fn symbols(&self) -> &[Symbol<'a>] {
        &self.symbols
    }

    /// 按列顺序遍历终结符, [`EOF`] 为最后一个.
    pub fn terminals(&self) -> impl Iterator<Item = Terminal<'a>> + '_ {
        self.symbols.iter().filter_map(Symbol::as_term)
    }

    pub fn non_terminals(&self) -> impl Iterator<Item = NonTerminal<'a>> + '_ {
        self.symbols.iter().filter_map(Symbol::as_non_term)
    }

    /// 按名字查找文法符号.
    #[must_use]
    pub fn get_symbol(&self, name: &str) -> Option<Symbol<'a>> {
        self.symbol_names.get(name).copied()
    }

    /// 从产生式列表构建文法, 产生式下标即为编号.
    pub fn from_prods(
        prods_in: Vec<Production<'a>>,
        start: NonTerminal<'a>,
        bump: &'a Bump,
    ) -> Result<Self, Error> {
        if !prods_in.iter().any(|p| p.head == start) {
            Err(Error::parse_production_error(
                0,
                ParseProductionError::StartSymbolNotFound,
            ))?
        }
        let mut prods: Vec<&'a Production<'a>> = Vec::new();
        let mut prod_indexes = HashMap::new();
        for prod in prods_in {
            let prod = &*bump.alloc(prod);
            prod_indexes.insert(prod, prods.len());
            prods.push(prod);
        }
        let mut symbols: Vec<Symbol<'a>> = Vec::new();
        let mut symbol_names: HashMap<&'a str, Symbol<'a>> = HashMap::new();
        {
            let mut add = |sym: Symbol<'a>| {
                if let Entry::Vacant(e) = symbol_names.entry(sym.as_str()) {
                    e.insert(sym);
                    symbols.push(sym);
                }
            };
            for prod in &prods {
                add(prod.head().into());
                for &sym in prod.tail() {
                    if sym != Symbol::Terminal(EPSILON) {
                        add(sym);
                    }
                }
            }
            add(EOF.into());
        }
        let mut grammar = Grammar {
            bump,
            prods,
            prod_indexes,
            symbols,
            symbol_names,
            start,
            first_sets: HashMap::new(),
            nullable: HashSet::new(),
            follow_sets: HashMap::new(),
        };
        grammar.compute_first();
        Ok(grammar)
    }

    /// 解析 `"E -> E + T | T"` 形式的文法描述, 每行一个头部, `|` 分隔候选式.
    ///
    /// 出现在某行头部的名字是非终结符, 其余名字是终结符, `#` 表示空串.
    pub fn from_cfg(s: &'a str, start: NonTerminal<'a>, bump: &'a Bump) -> Result<Self, Error> {
        let mut non_terminals = HashSet::new();
        let mut splitted: Vec<(&str, &str)> = Vec::new();
        // 找出所有的非终结符.
        for (line_num, line) in s
            .lines()
            .enumerate()
            .filter(|(_, s)| !s.is_empty() && s.chars().any(|c| !c.is_whitespace()))
        {
            let parts = line.split_once("->").ok_or(Error::parse_production_error(
                line_num,
                ParseProductionError::NoArrow,
            ))?;
            let head_ident = parts.0.trim();
            splitted.push((head_ident, parts.1));
            non_terminals.insert(head_ident);
        }
        // 验证是否有起始符.
        if !non_terminals.contains(&start.as_str()) {
            Err(Error::parse_production_error(
                0,
                ParseProductionError::StartSymbolNotFound,
            ))?
        }
        // 解析所有产生式.
        let mut prods = Vec::new();
        for (head_ident, tails) in splitted {
            for tail_s in tails.split('|') {
                let tail = tail_s
                    .split_ascii_whitespace()
                    .map(|s| {
                        if non_terminals.contains(&s) {
                            Symbol::from(NonTerminal::from(s))
                        } else {
                            Symbol::from(Terminal::from(s))
                        }
                    })
                    .collect();
                prods.push(Production::new(NonTerminal::from(head_ident), tail));
            }
        }
        Self::from_prods(prods, start, bump)
    }

    /// 增广文法: 前插产生式 0 `S' -> S`, 原有编号顺延, 同时计算 follow 集.
    #[must_use]
    pub fn augmented(mut self) -> Self {
        let new_start = self.bump.alloc(format!("{}'", self.start.as_str()));
        let augmented_start = NonTerminal::from(new_start.as_str());
        self.prod_indexes.values_mut().for_each(|x| *x += 1);
        let augmented_prod = &*self
            .bump
            .alloc(Production::new(augmented_start, vec![self.start.into()]));
        self.prods.insert(0, augmented_prod);
        self.prod_indexes.insert(augmented_prod, 0);
        self.symbols.insert(0, augmented_start.into());
        self.symbol_names
            .insert(augmented_start.as_str(), augmented_start.into());
        let start_first = self.first_sets.get(&self.start).cloned().unwrap_or_default();
        self.first_sets.insert(augmented_start, start_first);
        if self.nullable.contains(&self.start) {
            self.nullable.insert(augmented_start);
        }
        self.start = augmented_start;
        self.compute_follow();
        self
    }

    /// 获取以某个非终结符为头部的所有产生式, 保持编号顺序, 结果可能为空.
    #[must_use]
    pub(crate) fn prods_of(&self, nt: NonTerminal<'a>) -> Vec<&'a Production<'a>> {
        self.prods
            .iter()
            .copied()
            .filter(|p| p.head == nt)
            .collect()
    }

    #[must_use]
    pub fn first_of(&self, nt: NonTerminal<'a>) -> Option<&BTreeSet<Terminal<'a>>> {
        self.first_sets.get(&nt)
    }

    #[must_use]
    pub fn follow_of(&self, nt: NonTerminal<'a>) -> Option<&BTreeSet<Terminal<'a>>> {
        self.follow_sets.get(&nt)
    }

    #[must_use]
    pub fn is_nullable(&self, nt: NonTerminal<'a>) -> bool {
        self.nullable.contains(&nt)
    }

    /// 不动点迭代计算 first 集与可空集合, 左递归下也能收敛.
    fn compute_first(&mut self) {
        let mut first: HashMap<NonTerminal<'a>, BTreeSet<Terminal<'a>>> = self
            .non_terminals()
            .map(|nt| (nt, BTreeSet::new()))
            .collect();
        let mut nullable: HashSet<NonTerminal<'a>> = HashSet::new();
        loop {
            let mut changed = false;
            for prod in &self.prods {
                let mut gathered = BTreeSet::new();
                let mut tail_nullable = true;
                for sym in prod.tail_without_eps() {
                    match sym {
                        Symbol::Terminal(t) => {
                            gathered.insert(*t);
                            tail_nullable = false;
                        }
                        Symbol::NonTerminal(nt) => {
                            gathered.extend(first.get(nt).into_iter().flatten().copied());
                            tail_nullable = nullable.contains(nt);
                        }
                    }
                    if !tail_nullable {
                        break;
                    }
                }
                let dst = first.entry(prod.head()).or_default();
                for t in gathered {
                    changed |= dst.insert(t);
                }
                if tail_nullable {
                    changed |= nullable.insert(prod.head());
                }
            }
            if !changed {
                break;
            }
        }
        self.first_sets = first;
        self.nullable = nullable;
    }

    /// 一个符号序列的 first 集, 以及该序列整体是否可以推导出空串.
    pub(crate) fn first_of_seq(
        &self,
        seq: impl IntoIterator<Item = Symbol<'a>>,
    ) -> (BTreeSet<Terminal<'a>>, bool) {
        let mut set = BTreeSet::new();
        for sym in seq {
            match sym {
                Symbol::Terminal(t) if t == EPSILON => continue,
                Symbol::Terminal(t) => {
                    set.insert(t);
                    return (set, false);
                }
                Symbol::NonTerminal(nt) => {
                    set.extend(self.first_sets.get(&nt).into_iter().flatten().copied());
                    if !self.is_nullable(nt) {
                        return (set, false);
                    }
                }
            }
        }
        (set, true)
    }

    /// 不动点迭代计算 follow 集, 以 [`EOF`] 属于 FOLLOW(起始符) 为种子.
    fn compute_follow(&mut self) {
        let mut follow: HashMap<NonTerminal<'a>, BTreeSet<Terminal<'a>>> = self
            .non_terminals()
            .map(|nt| (nt, BTreeSet::new()))
            .collect();
        if let Some(set) = follow.get_mut(&self.start) {
            set.insert(EOF);
        }
        loop {
            let mut changed = false;
            for prod in self.prods.iter().copied() {
                let tail: Vec<Symbol<'a>> = prod.tail_without_eps().copied().collect();
                for (i, sym) in tail.iter().enumerate() {
                    let Symbol::NonTerminal(nt) = *sym else {
                        continue;
                    };
                    let (mut pending, beta_nullable) =
                        self.first_of_seq(tail[i + 1..].iter().copied());
                    if beta_nullable {
                        pending.extend(follow.get(&prod.head()).into_iter().flatten().copied());
                    }
                    let dst = follow.entry(nt).or_default();
                    for t in pending {
                        changed |= dst.insert(t);
                    }
                }
            }
            if !changed {
                break;
            }
        }
        self.follow_sets = follow;
    }
}
