use tracing::debug;

use crate::{Grammar, Table, Terminal, error::Error, lexer::Token, symbol::EOF, table::Action};

/// 分析栈条目上承载的语义值.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<V> {
    /// 移入终结符时的 token 值.
    Term(String),
    /// 规约非终结符时的动作结果.
    NonTerm(V),
    /// 栈底哨兵.
    End,
}

impl<V> Value<V> {
    #[must_use]
    pub fn term(self) -> Option<String> {
        match self {
            Self::Term(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn non_term(self) -> Option<V> {
        match self {
            Self::NonTerm(v) => Some(v),
            _ => None,
        }
    }
}

/// 产生式的语义动作, 入参为尾部各符号的值, 自左向右.
pub type Reduction<'a, V> = Box<dyn Fn(Vec<Value<V>>) -> V + 'a>;

struct StackEntry<V> {
    value: Value<V>,
    state: usize,
}

/// 由分析表驱动的移入-规约分析器.
///
/// 表是只读的, 同一个分析器可以对多段输入反复调用 [`Parser::parse`],
/// 每次分析使用独立的栈.
pub struct Parser<'a, V> {
    grammar: &'a Grammar<'a>,
    table: &'a Table<'a>,
    /// 语义动作, 按产生式编号顺序, 不含增广产生式.
    reductions: Vec<Reduction<'a, V>>,
}

impl<V> std::fmt::Debug for Parser<'_, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser").finish_non_exhaustive()
    }
}

impl<'a, V> Parser<'a, V> {
    /// 动作数量必须与非增广产生式数量一致, 否则返回 [`Error::ReductionCountMismatch`].
    pub fn new(
        grammar: &'a Grammar<'a>,
        table: &'a Table<'a>,
        reductions: Vec<Reduction<'a, V>>,
    ) -> Result<Self, Error> {
        let expected = grammar.prods().len().saturating_sub(1);
        if reductions.len() != expected {
            Err(Error::ReductionCountMismatch {
                expected,
                found: reductions.len(),
            })?
        }
        Ok(Self {
            grammar,
            table,
            reductions,
        })
    }

    pub fn parse<I>(&self, tokens: I) -> Result<V, Error>
    where
        I: IntoIterator<Item = Token>,
    {
        let mut input = tokens.into_iter();
        let mut lookahead = input.next();
        let mut stack = vec![StackEntry {
            value: Value::End,
            state: 0,
        }];
        loop {
            let Some(top) = stack.last() else {
                return Err(Error::CorruptStack);
            };
            let state = top.state;
            let term = lookahead
                .as_ref()
                .map_or(EOF, |tok| Terminal::from(tok.name.as_str()));
            let Some(act) = self.table.action(state, term) else {
                return Err(Error::SyntaxError {
                    token: lookahead.map(|tok| tok.value),
                    state,
                });
            };
            match act {
                Action::Shift(to) => {
                    // EOF 列上不会出现移入, lookahead 一定存在.
                    let Some(tok) = lookahead else {
                        return Err(Error::CorruptStack);
                    };
                    debug!("shift {} -> I_{to}", tok.name);
                    stack.push(StackEntry {
                        value: Value::Term(tok.value),
                        state: to,
                    });
                    lookahead = input.next();
                }
                Action::Reduce(prod_idx) => {
                    let Some(&prod) = self.grammar.prods().get(prod_idx) else {
                        return Err(Error::CorruptStack);
                    };
                    let Some(reduction) = prod_idx
                        .checked_sub(1)
                        .and_then(|i| self.reductions.get(i))
                    else {
                        return Err(Error::CorruptStack);
                    };
                    let count = prod.len();
                    if stack.len() <= count {
                        return Err(Error::CorruptStack);
                    }
                    // drain 保持条目自左向右的顺序, 与产生式尾部一致.
                    let children: Vec<Value<V>> = stack
                        .drain(stack.len() - count..)
                        .map(|entry| entry.value)
                        .collect();
                    let Some(below) = stack.last() else {
                        return Err(Error::CorruptStack);
                    };
                    let Some(to) = self.table.goto(below.state, prod.head()) else {
                        return Err(Error::MissingGoto {
                            state: below.state,
                            non_terminal: prod.head().as_str().to_string(),
                        });
                    };
                    debug!("reduce {prod} -> I_{to}");
                    stack.push(StackEntry {
                        value: Value::NonTerm(reduction(children)),
                        state: to,
                    });
                }
                Action::Accept => {
                    debug!("accept");
                    let Some(entry) = stack.pop() else {
                        return Err(Error::CorruptStack);
                    };
                    return match entry.value {
                        Value::NonTerm(v) => Ok(v),
                        _ => Err(Error::CorruptStack),
                    };
                }
            }
        }
    }
}
