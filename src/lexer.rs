use std::{collections::BTreeSet, ops::Range};

use regex_automata::{Anchored, Input, meta::Regex};

use crate::error::Error;

/// 词法单元, 词法分析与语法分析之间的边界类型.
///
/// `name` 对应文法中的终结符名, `value` 是匹配到的原文.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub name: String,
    pub value: String,
}

impl Token {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// 单字符字面量 token, 名字即为字符本身.
    #[must_use]
    pub fn literal(c: char) -> Self {
        let s = c.to_string();
        Self {
            name: s.clone(),
            value: s,
        }
    }
}

/// 词法规则, 命中 `pattern` 时产出名为 `name` 的 token.
#[derive(Debug)]
pub struct TokenRule<'a> {
    name: &'a str,
    re: Regex,
}

impl<'a> TokenRule<'a> {
    pub fn new(name: &'a str, pattern: &str) -> Result<Self, Error> {
        let re = Regex::new(pattern).map_err(|e| Error::InvalidTokenPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { name, re })
    }
}

/// 基于规则表的词法分析器.
///
/// 规则按声明顺序尝试, 第一条命中的规则获胜, 不做最长匹配;
/// 所有规则都失配之后才检查单字符字面量.
pub struct Lexer<'a> {
    rules: Vec<TokenRule<'a>>,
    /// token 之间跳过的内容, 通常是空白.
    ignore: Option<Regex>,
    literals: BTreeSet<char>,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(rules: Vec<TokenRule<'a>>) -> Self {
        Self {
            rules,
            ignore: None,
            literals: BTreeSet::new(),
        }
    }

    pub fn with_ignore(mut self, pattern: &str) -> Result<Self, Error> {
        let re = Regex::new(pattern).map_err(|e| Error::InvalidTokenPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.ignore = Some(re);
        Ok(self)
    }

    #[must_use]
    pub fn with_literals(mut self, literals: impl IntoIterator<Item = char>) -> Self {
        self.literals.extend(literals);
        self
    }

    /// 把整段输入切分成 token 序列.
    ///
    /// 无法识别的输入返回 [`Error::UnrecognizedToken`], 带上出错处的文本前缀.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>, Error> {
        let mut tokens = Vec::new();
        let mut pos = 0;
        'scan: while pos < text.len() {
            if let Some(ignore) = &self.ignore
                && let Some(m) = match_prefix(ignore, text, pos)
            {
                pos = m.end;
                continue;
            }
            for rule in &self.rules {
                if let Some(m) = match_prefix(&rule.re, text, pos) {
                    tokens.push(Token::new(rule.name, &text[m.clone()]));
                    pos = m.end;
                    continue 'scan;
                }
            }
            let Some(c) = text[pos..].chars().next() else {
                break;
            };
            if self.literals.contains(&c) {
                tokens.push(Token::literal(c));
                pos += c.len_utf8();
                continue;
            }
            return Err(Error::UnrecognizedToken {
                text: text[pos..].chars().take(16).collect(),
            });
        }
        Ok(tokens)
    }
}

/// 在 `pos` 处做锚定匹配, 只接受非空匹配.
fn match_prefix(re: &Regex, text: &str, pos: usize) -> Option<Range<usize>> {
    let input = Input::new(text).range(pos..).anchored(Anchored::Yes);
    let m = re.find(input)?;
    if m.is_empty() { None } else { Some(m.range()) }
}
