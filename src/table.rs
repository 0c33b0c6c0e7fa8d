use std::{collections::HashMap, fmt::Display};

use tracing::info;

use crate::{Automaton, Grammar, NonTerminal, Symbol, Terminal, error::Error, symbol::EOF};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// 移入项集状态编号.
    Shift(usize),
    /// 规约产生式编号.
    Reduce(usize),
    /// 接受.
    Accept,
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&match self {
            Self::Shift(s) => format!("s{s}"),
            Self::Reduce(r) => format!("r{r}"),
            Self::Accept => "acc".to_string(),
        })
    }
}

/// SLR(1) 分析表.
///
/// 列顺序沿用 [`Grammar::symbols`] 的顺序, ACTION 表的最后一列是 [`EOF`].
#[derive(Debug, PartialEq, Eq)]
pub struct Table<'a> {
    /// ACTION 表.
    action: Vec<Vec<Option<Action>>>,
    /// GOTO 表, 每个格子表示 GOTO 到的项集状态编号.
    goto: Vec<Vec<Option<usize>>>,
    /// ACTION 表中的终结符, 下标即为 ACTION 表中的列.
    terms: Vec<Terminal<'a>>,
    /// GOTO 表中的非终结符, 下标即为 GOTO 表中的列.
    non_terms: Vec<NonTerminal<'a>>,
    term_idxes: HashMap<&'a str, usize>,
    non_term_idxes: HashMap<&'a str, usize>,
}

impl<'a> Table<'a> {
    /// 从项集族填表.
    ///
    /// 终结符出边写移入, 非终结符出边写 GOTO; 状态中每个可规约项
    /// 在 FOLLOW(头部) 的每个终结符列写规约, 产生式 0 规约改写为 [`EOF`] 列的接受.
    /// 任何一个格子被写入两个不同动作即为冲突, 填表失败, 不产出任何表.
    pub fn build_from(automaton: &Automaton<'a>, grammar: &Grammar<'a>) -> Result<Self, Error> {
        let terms: Vec<Terminal<'a>> = grammar.terminals().collect();
        let non_terms: Vec<NonTerminal<'a>> = grammar.non_terminals().collect();
        let term_idxes: HashMap<&'a str, usize> = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();
        let non_term_idxes: HashMap<&'a str, usize> = non_terms
            .iter()
            .enumerate()
            .map(|(i, nt)| (nt.as_str(), i))
            .collect();
        let eof_idx = *term_idxes.get(EOF.as_str()).unwrap();
        let rows = automaton.len();
        let mut action: Vec<Vec<Option<Action>>> = vec![vec![None; terms.len()]; rows];
        let mut goto: Vec<Vec<Option<usize>>> = vec![vec![None; non_terms.len()]; rows];
        let mut accept_state: Option<usize> = None;
        for (row, is) in automaton.states().iter().enumerate() {
            for &(sym, to) in automaton.transitions_of(row) {
                match sym {
                    Symbol::Terminal(t) => {
                        action[row][*term_idxes.get(t.as_str()).unwrap()] =
                            Some(Action::Shift(to));
                    }
                    Symbol::NonTerminal(nt) => {
                        goto[row][*non_term_idxes.get(nt.as_str()).unwrap()] = Some(to);
                    }
                }
            }
            for item in is.reduce_items() {
                let prod_idx = grammar.index_of_prod(item.prod()).unwrap();
                if prod_idx == 0 {
                    // 增广产生式已完成, 只在 EOF 列接受.
                    if let Some(first) = accept_state
                        && first != row
                    {
                        return Err(Error::AcceptConflict { first, second: row });
                    }
                    accept_state = Some(row);
                    match action[row][eof_idx] {
                        None => action[row][eof_idx] = Some(Action::Accept),
                        Some(Action::Accept) => {}
                        Some(Action::Reduce(other)) => {
                            return Err(Error::ReduceReduceConflict {
                                state: row,
                                terminal: EOF.as_str().to_string(),
                                first: other,
                                second: 0,
                            });
                        }
                        Some(Action::Shift(shift)) => {
                            return Err(Error::ShiftReduceConflict {
                                state: row,
                                terminal: EOF.as_str().to_string(),
                                shift,
                                reduce: 0,
                            });
                        }
                    }
                    continue;
                }
                let follow = grammar.follow_of(item.prod().head());
                for &t in follow.into_iter().flatten() {
                    let col = *term_idxes.get(t.as_str()).unwrap();
                    match action[row][col] {
                        None => action[row][col] = Some(Action::Reduce(prod_idx)),
                        Some(Action::Reduce(other)) if other == prod_idx => {}
                        Some(Action::Reduce(other)) => {
                            return Err(Error::ReduceReduceConflict {
                                state: row,
                                terminal: t.as_str().to_string(),
                                first: other,
                                second: prod_idx,
                            });
                        }
                        Some(Action::Shift(shift)) => {
                            return Err(Error::ShiftReduceConflict {
                                state: row,
                                terminal: t.as_str().to_string(),
                                shift,
                                reduce: prod_idx,
                            });
                        }
                        Some(Action::Accept) => {
                            return Err(Error::ReduceReduceConflict {
                                state: row,
                                terminal: t.as_str().to_string(),
                                first: 0,
                                second: prod_idx,
                            });
                        }
                    }
                }
            }
        }
        info!(
            "SLR(1) table built: {rows} states, {} terminals, {} non-terminals",
            terms.len(),
            non_terms.len()
        );
        Ok(Self {
            action,
            goto,
            terms,
            non_terms,
            term_idxes,
            non_term_idxes,
        })
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.action.len()
    }

    #[must_use]
    pub fn action_cols(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn goto_cols(&self) -> usize {
        self.non_terms.len()
    }

    /// 查询 ACTION 表, 获取一个项集状态在某个终结符下的动作.
    /// 如果状态不存在, 终结符不在文法中, 或者格子为空, 那么返回 [`None`].
    #[must_use]
    pub fn action(&self, state: usize, term: Terminal<'_>) -> Option<Action> {
        let term_idx = *self.term_idxes.get(term.as_str())?;
        let row = self.action.get(state)?;
        row[term_idx]
    }

    /// 查询 GOTO(state, non_term), 没有出边时返回 [`None`].
    #[must_use]
    pub fn goto(&self, state: usize, non_term: NonTerminal<'_>) -> Option<usize> {
        let non_term_idx = *self.non_term_idxes.get(non_term.as_str())?;
        let row = self.goto.get(state)?;
        row[non_term_idx]
    }

    /// 使用 markdown 形式输出表格.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut header_line = "| |".to_string();
        header_line += &self
            .terms
            .iter()
            .map(|t| format!(" `{}` |", t.as_str()))
            .chain(
                self.non_terms
                    .iter()
                    .map(|nt| format!(" `{}` |", nt.as_str())),
            )
            .collect::<String>();
        let sep_line: String = String::from("| - |")
            + &std::iter::repeat_n(" - |", self.terms.len() + self.non_terms.len())
                .collect::<String>();
        let mut data_lines = String::new();
        for (i, (action_row, goto_row)) in self.action.iter().zip(self.goto.iter()).enumerate() {
            let line = format!("| $I_{{{i}}}$ |")
                + &action_row
                    .iter()
                    .map(|act| {
                        if let Some(act) = act {
                            format!(" {act} |")
                        } else {
                            "  |".to_string()
                        }
                    })
                    .chain(goto_row.iter().map(|to| {
                        if let Some(to) = to {
                            format!(" {to} |")
                        } else {
                            "  |".to_string()
                        }
                    }))
                    .collect::<String>();
            data_lines += &line;
            data_lines += "\n";
        }
        format!("{header_line}\n{sep_line}\n{}", data_lines.trim_end())
    }
}

#[cfg(test)]
mod test {
    use bumpalo::Bump;

    use crate::{
        Automaton, Grammar, NonTerminal, Terminal,
        error::Error,
        table::{Action, Table},
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
    fn classic_grammar_table() {
        let bump = Bump::new();
        let grammar = classic_grammar(&bump);
        let automaton = Automaton::from_grammar(&grammar).unwrap();
        let table = Table::build_from(&automaton, &grammar).unwrap();
        assert_eq!(table.rows(), 12);
        assert_eq!(
            table.to_markdown(),
            r#"
| | `+` | `*` | `(` | `)` | `id` | `$` | `E'` | `E` | `T` | `F` |
| - | - | - | - | - | - | - | - | - | - | - |
| $I_{0}$ |  |  | s4 |  | s5 |  |  | 1 | 2 | 3 |
| $I_{1}$ | s6 |  |  |  |  | acc |  |  |  |  |
| $I_{2}$ | r2 | s7 |  | r2 |  | r2 |  |  |  |  |
| $I_{3}$ | r4 | r4 |  | r4 |  | r4 |  |  |  |  |
| $I_{4}$ |  |  | s4 |  | s5 |  |  | 8 | 2 | 3 |
| $I_{5}$ | r6 | r6 |  | r6 |  | r6 |  |  |  |  |
| $I_{6}$ |  |  | s4 |  | s5 |  |  |  | 9 | 3 |
| $I_{7}$ |  |  | s4 |  | s5 |  |  |  |  | 10 |
| $I_{8}$ | s6 |  |  | s11 |  |  |  |  |  |  |
| $I_{9}$ | r1 | s7 |  | r1 |  | r1 |  |  |  |  |
| $I_{10}$ | r3 | r3 |  | r3 |  | r3 |  |  |  |  |
| $I_{11}$ | r5 | r5 |  | r5 |  | r5 |  |  |  |  |
"#
            .trim()
        );
    }

    #[test]
    fn table_lookups() {
        let bump = Bump::new();
        let grammar = classic_grammar(&bump);
        let automaton = Automaton::from_grammar(&grammar).unwrap();
        let table = Table::build_from(&automaton, &grammar).unwrap();
        assert_eq!(
            table.action(0, Terminal::from("(")),
            Some(Action::Shift(4))
        );
        assert_eq!(
            table.action(0, Terminal::from("id")),
            Some(Action::Shift(5))
        );
        assert_eq!(table.action(0, Terminal::from("+")), None);
        assert_eq!(table.action(1, Terminal::from("$")), Some(Action::Accept));
        assert_eq!(
            table.action(9, Terminal::from("+")),
            Some(Action::Reduce(1))
        );
        assert_eq!(
            table.action(9, Terminal::from("*")),
            Some(Action::Shift(7))
        );
        // 文法之外的终结符与越界状态.
        assert_eq!(table.action(0, Terminal::from("unknown")), None);
        assert_eq!(table.action(99, Terminal::from("id")), None);
        assert_eq!(table.goto(0, NonTerminal::from("E")), Some(1));
        assert_eq!(table.goto(4, NonTerminal::from("E")), Some(8));
        assert_eq!(table.goto(6, NonTerminal::from("T")), Some(9));
        assert_eq!(table.goto(7, NonTerminal::from("F")), Some(10));
        assert_eq!(table.goto(1, NonTerminal::from("E")), None);
    }

    #[test]
    fn shift_reduce_conflict_is_an_error() {
        let bump = Bump::new();
        let grammar = Grammar::from_cfg("E -> E + E | id", "E".into(), &bump)
            .unwrap()
            .augmented();
        let automaton = Automaton::from_grammar(&grammar).unwrap();
        assert_eq!(
            Table::build_from(&automaton, &grammar).unwrap_err(),
            Error::ShiftReduceConflict {
                state: 4,
                terminal: "+".to_string(),
                shift: 3,
                reduce: 1,
            }
        );
    }

    #[test]
    fn reduce_reduce_conflict_is_an_error() {
        let bump = Bump::new();
        let grammar = Grammar::from_cfg(
            "S -> A | B
            A -> x
            B -> x",
            "S".into(),
            &bump,
        )
        .unwrap()
        .augmented();
        let automaton = Automaton::from_grammar(&grammar).unwrap();
        assert_eq!(
            Table::build_from(&automaton, &grammar).unwrap_err(),
            Error::ReduceReduceConflict {
                state: 4,
                terminal: "$".to_string(),
                first: 3,
                second: 4,
            }
        );
    }

    #[test]
    fn rebuilds_are_identical() {
        let build = |bump: &Bump| {
            let grammar = classic_grammar(bump);
            let automaton = Automaton::from_grammar(&grammar).unwrap();
            Table::build_from(&automaton, &grammar)
                .unwrap()
                .to_markdown()
        };
        let bump_a = Bump::new();
        let bump_b = Bump::new();
        assert_eq!(build(&bump_a), build(&bump_b));
    }
}
