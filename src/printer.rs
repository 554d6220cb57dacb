use crate::value::Cell;

/// Render a cell for output. Numbers use the plain decimal form of the
/// double, the booleans print as the single characters `t` and `f`,
/// procedures print as the word `proc`, and lists come out parenthesised
/// with single spaces, operator and keyword heads printed by their source
/// spelling so that printed forms read back as the same tree.
pub fn print_cell(cell: &Cell) -> String {
    let mut out = String::new();
    write_cell(cell, &mut out);
    out
}

fn write_cell(cell: &Cell, out: &mut String) {
    match cell {
        Cell::Number(n) => out.push_str(&n.to_string()),
        Cell::Name(s) => out.push_str(s),
        Cell::Proc(_) => out.push_str("proc"),
        Cell::Tag(k) => out.push_str(k.spelling()),
        Cell::Expr(list) => write_list(list, out),
    }
}

fn write_list(list: &[Cell], out: &mut String) {
    out.push('(');
    for (i, cell) in list.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_cell(cell, out);
    }
    out.push(')');
}
