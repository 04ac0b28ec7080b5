use twine_lib::Unparser;

fn main() {
    let parser = r#"
        parser grammar CsvParser;
        file  : row (NL row)* ;
        row   : field (',' field)* ;
        field : WORD ;
    "#;
    let lexer = r#"
        lexer grammar CsvLexer;
        WORD : [a-z]+ ;
        NL   : '\n' ;
    "#;

    let unparser = Unparser::from_sources(&[parser, lexer]).unwrap();
    println!("merged grammars: {:?}", unparser.grammar_names().collect::<Vec<_>>());
    println!("{}", unparser);
    println!("{}", unparser.generate("file", 3).unwrap());
}
