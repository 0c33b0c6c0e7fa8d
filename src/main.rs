use std::io::{self, Read};

use bumpalo::Bump;
use clap::Parser as _;
use slr_analysis::{Automaton, Grammar, Table};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    Layer, fmt, layer::SubscriberExt, registry, util::SubscriberInitExt,
};

/// 从 stdin 读取文法, 打印编号产生式, 项集族和 SLR(1) 分析表.
#[derive(clap::Parser)]
struct AppArgs {
    /// 文法的起始符号.
    #[clap(short, long)]
    symbol_start: String,
}

fn main() {
    registry()
        .with(
            fmt::layer()
                .without_time()
                .with_writer(io::stderr)
                .with_filter(LevelFilter::INFO),
        )
        .init();
    let args = AppArgs::parse();
    let mut inp = String::new();
    io::stdin().read_to_string(&mut inp).unwrap();
    let bump = Bump::new();
    let grammar = Grammar::from_cfg(&inp, args.symbol_start.as_str().into(), &bump)
        .unwrap()
        .augmented();
    for prod in grammar.prods() {
        println!("{:>4} {}", grammar.index_of_prod(prod).unwrap(), prod);
    }
    println!();
    let automaton = Automaton::from_grammar(&grammar).unwrap();
    for (from, is) in automaton.states().iter().enumerate() {
        println!("I_{from}:");
        for item in is.items() {
            println!("{}", item);
        }
        println!("reduces:");
        for item in is.reduce_items() {
            println!("r {}", grammar.index_of_prod(item.prod()).unwrap());
        }
        println!("gotos:");
        for &(sym, to) in automaton.transitions_of(from) {
            println!("I_{from} -- {sym:?} --> I_{to}");
        }
        println!();
    }
    println!("--- Table ---");
    match Table::build_from(&automaton, &grammar) {
        Ok(table) => println!("{}", table.to_markdown()),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
