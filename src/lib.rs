pub mod error;
pub mod grammar;
pub mod item;
pub mod lexer;
pub mod parser;
pub mod symbol;
pub mod table;

pub use grammar::{Grammar, Production};
pub use item::{Automaton, Item, ItemSet};
pub use lexer::{Lexer, Token, TokenRule};
pub use parser::{Parser, Reduction, Value};
pub use symbol::{NonTerminal, Symbol, Terminal};
pub use table::{Action, Table};
