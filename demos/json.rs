use twine_lib::{Context, Unparser};

fn main() {
    let unparser: Unparser = r#"
        grammar Json;
        json     : object ;
        object   : '{' pair (', ' pair)* '}' ;
        pair     : string ': ' value ;
        value    : object | array | string | NUMBER ;
        array    : '[' value (', ' value)* ']' ;
        string   : '"' WORD '"' ;
        WORD     : [a-zA-Z_0-9]+ ;
        NUMBER   : [1-9] [0-9]* ;
    "#
    .parse()
    .unwrap();

    let sentence = unparser.generate("json", 7).unwrap();
    println!("{}", sentence);

    // the same seed, rendered as a production tree
    let mut ctx = Context::new(7);
    let text = unparser.generate_text("json", &mut ctx).unwrap();
    println!("{}", text.tree());
}
