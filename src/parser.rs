use crate::error::{Error, Result};
use crate::lexer::TokenStream;
use crate::value::{Cell, Kind};

/// Read one balanced form from the token stream as a list of cells.
///
/// Top-level calls (`top = true`) skip leading comment lines and consume
/// the opening `(` themselves; recursive calls enter with the `(` already
/// eaten. Every nested form comes back as an `Expr` cell, and the
/// recursion must stop on a matching `)` or the form is unbalanced.
pub fn parse_one(stream: &mut TokenStream, top: bool) -> Result<Vec<Cell>> {
    if top {
        loop {
            let tok = stream.get()?;
            if tok.kind() == Kind::Comment {
                stream.ignore_line();
            } else {
                break; // the opening ( is consumed here
            }
        }
    }

    let mut form = Vec::new();
    loop {
        let tok = stream.get()?;
        match tok.kind() {
            Kind::Lp => {
                let sub = parse_one(stream, false)?;
                if stream.current().kind() != Kind::Rp {
                    return Err(Error::UnbalancedParens);
                }
                form.push(Cell::Expr(sub));
            }
            Kind::Rp | Kind::End => return Ok(form),
            Kind::Comment => stream.ignore_line(),
            _ => form.push(tok),
        }
    }
}
