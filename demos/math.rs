use twine_lib::Unparser;

fn main() {
    let unparser: Unparser = r#"
        grammar Math;
        expr   : num | '(' expr symbol expr ')' ;
        symbol : '+' | '-' | '*' | '/' ;
        num    : INT ;
        INT    : [0-9]+ ;
    "#
    .parse()
    .unwrap();

    for seed in 0..10 {
        println!("{}", unparser.generate("expr", seed).unwrap());
    }
}
