use crate::error::{Error, Result};
use crate::value::{Cell, Kind};

/// Apply a primitive operator to a fully-evaluated argument list.
/// Every primitive takes at least one argument.
pub fn apply_prim(prim: Kind, args: Vec<Cell>) -> Result<Cell> {
    if args.is_empty() {
        return Err(Error::PrimitiveArity(prim.spelling()));
    }
    match prim {
        Kind::Add => fold_numbers(&args, |acc, n| acc + n),
        Kind::Sub => fold_numbers(&args, |acc, n| acc - n),
        Kind::Mul => fold_numbers(&args, |acc, n| acc * n),
        // division by zero is unchecked: IEEE infinities and NaN flow out
        Kind::Div => fold_numbers(&args, |acc, n| acc / n),
        Kind::Cat => {
            let mut text = args[0].as_name()?.to_string();
            for arg in &args[1..] {
                text.push_str(arg.as_name()?);
            }
            Ok(Cell::Name(text))
        }
        Kind::Less => cell_less(&args[0], second(&args)?).map(Cell::from_bool),
        Kind::Equal => cell_equal(&args[0], second(&args)?).map(Cell::from_bool),
        // a > b is b < a, not a negation of < and =
        Kind::Greater => cell_less(second(&args)?, &args[0]).map(Cell::from_bool),
        Kind::And => {
            for arg in args {
                if arg.kind() == Kind::False {
                    return Ok(arg);
                }
            }
            Ok(Cell::tag(Kind::True))
        }
        Kind::Or => {
            for arg in args {
                if arg.kind() == Kind::True {
                    return Ok(arg);
                }
            }
            Ok(Cell::tag(Kind::False))
        }
        Kind::Not => Ok(Cell::from_bool(args[0].kind() == Kind::False)),
        // list and cons both package their arguments; cons conventionally
        // takes two, list any number
        Kind::List | Kind::Cons => Ok(Cell::Expr(args)),
        Kind::Car => match &args[0] {
            Cell::Expr(list) if !list.is_empty() => Ok(list[0].clone()),
            other => Ok(other.clone()),
        },
        Kind::Cdr => match &args[0] {
            Cell::Expr(list) => match list.len() {
                0 | 1 => Ok(Cell::Expr(Vec::new())),
                2 => Ok(list[1].clone()),
                _ => Ok(Cell::Expr(list[1..].to_vec())),
            },
            _ => Ok(Cell::Expr(Vec::new())),
        },
        Kind::Empty => Ok(Cell::from_bool(
            matches!(&args[0], Cell::Expr(list) if list.is_empty()),
        )),
        _ => Err(Error::UnmatchedCell("apply_prim")),
    }
}

/// Left fold with the first argument as accumulator.
fn fold_numbers(args: &[Cell], op: impl Fn(f64, f64) -> f64) -> Result<Cell> {
    let mut acc = args[0].as_number()?;
    for arg in &args[1..] {
        acc = op(acc, arg.as_number()?);
    }
    Ok(Cell::Number(acc))
}

fn second(args: &[Cell]) -> Result<&Cell> {
    args.get(1).ok_or(Error::ArityMismatch {
        expected: 2,
        got: args.len(),
    })
}

/// Ordering dispatched on the first operand's kind: numbers numerically,
/// names as strings, lists lexicographically on their cells.
fn cell_less(a: &Cell, b: &Cell) -> Result<bool> {
    match a {
        Cell::Number(x) => Ok(*x < b.as_number()?),
        Cell::Name(x) => Ok(x.as_str() < b.as_name()?),
        Cell::Expr(xs) => list_less(xs, b.as_expr()?),
        _ => Err(Error::TypeMismatch(format!(
            "cannot order '{}'",
            crate::printer::print_cell(a)
        ))),
    }
}

fn list_less(xs: &[Cell], ys: &[Cell]) -> Result<bool> {
    for (x, y) in xs.iter().zip(ys) {
        if cell_less(x, y)? {
            return Ok(true);
        }
        if cell_less(y, x)? {
            return Ok(false);
        }
    }
    Ok(xs.len() < ys.len())
}

/// Equality dispatched on the first operand's kind. Procedure equality is
/// handle identity; payload-free cells compare by kind.
fn cell_equal(a: &Cell, b: &Cell) -> Result<bool> {
    match a {
        Cell::Number(x) => Ok(*x == b.as_number()?),
        Cell::Name(x) => Ok(x == b.as_name()?),
        Cell::Proc(x) => Ok(*x == b.as_proc()?),
        Cell::Expr(xs) => {
            let ys = b.as_expr()?;
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (x, y) in xs.iter().zip(ys) {
                if !cell_equal(x, y)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Cell::Tag(k) => match b {
            Cell::Tag(k2) => Ok(k == k2),
            _ => Err(Error::TypeMismatch("expected a boolean".into())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ProcId;

    fn num(n: f64) -> Cell {
        Cell::Number(n)
    }

    fn name(s: &str) -> Cell {
        Cell::Name(s.into())
    }

    #[test]
    fn arithmetic_folds_left_to_right() {
        assert_eq!(
            apply_prim(Kind::Add, vec![num(1.0), num(2.0), num(3.0)]).unwrap(),
            num(6.0)
        );
        assert_eq!(
            apply_prim(Kind::Sub, vec![num(10.0), num(3.0), num(2.0)]).unwrap(),
            num(5.0)
        );
        assert_eq!(
            apply_prim(Kind::Mul, vec![num(2.0), num(3.0), num(4.0)]).unwrap(),
            num(24.0)
        );
        assert_eq!(
            apply_prim(Kind::Div, vec![num(12.0), num(2.0), num(3.0)]).unwrap(),
            num(2.0)
        );
    }

    #[test]
    fn division_by_zero_is_ieee() {
        let res = apply_prim(Kind::Div, vec![num(1.0), num(0.0)]).unwrap();
        assert_eq!(res.as_number().unwrap(), f64::INFINITY);
    }

    #[test]
    fn zero_arguments_is_an_arity_error() {
        assert_eq!(
            apply_prim(Kind::Add, vec![]).unwrap_err(),
            Error::PrimitiveArity("+")
        );
        assert_eq!(
            apply_prim(Kind::List, vec![]).unwrap_err(),
            Error::PrimitiveArity("list")
        );
    }

    #[test]
    fn numeric_op_on_a_name_is_a_type_mismatch() {
        assert!(matches!(
            apply_prim(Kind::Add, vec![num(1.0), name("x")]),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn cat_concatenates_names() {
        assert_eq!(
            apply_prim(Kind::Cat, vec![name("foo"), name("bar"), name("!")]).unwrap(),
            name("foobar!")
        );
    }

    #[test]
    fn comparisons_dispatch_on_first_kind() {
        assert_eq!(
            apply_prim(Kind::Less, vec![num(1.0), num(2.0)]).unwrap(),
            Cell::tag(Kind::True)
        );
        assert_eq!(
            apply_prim(Kind::Less, vec![name("abc"), name("abd")]).unwrap(),
            Cell::tag(Kind::True)
        );
        assert_eq!(
            apply_prim(Kind::Equal, vec![num(3.0), num(3.0)]).unwrap(),
            Cell::tag(Kind::True)
        );
        assert_eq!(
            apply_prim(Kind::Equal, vec![name("a"), name("b")]).unwrap(),
            Cell::tag(Kind::False)
        );
    }

    #[test]
    fn greater_is_swapped_less() {
        assert_eq!(
            apply_prim(Kind::Greater, vec![num(5.0), num(2.0)]).unwrap(),
            Cell::tag(Kind::True)
        );
        assert_eq!(
            apply_prim(Kind::Greater, vec![num(2.0), num(5.0)]).unwrap(),
            Cell::tag(Kind::False)
        );
    }

    #[test]
    fn lists_compare_lexicographically() {
        let a = Cell::Expr(vec![num(1.0), num(2.0)]);
        let b = Cell::Expr(vec![num(1.0), num(3.0)]);
        assert_eq!(
            apply_prim(Kind::Less, vec![a.clone(), b.clone()]).unwrap(),
            Cell::tag(Kind::True)
        );
        assert_eq!(
            apply_prim(Kind::Equal, vec![a.clone(), a.clone()]).unwrap(),
            Cell::tag(Kind::True)
        );
        // a shorter prefix orders first
        let prefix = Cell::Expr(vec![num(1.0)]);
        assert_eq!(
            apply_prim(Kind::Less, vec![prefix, a]).unwrap(),
            Cell::tag(Kind::True)
        );
    }

    #[test]
    fn procedure_equality_is_handle_identity() {
        let p = Cell::Proc(ProcId(1));
        let q = Cell::Proc(ProcId(2));
        assert_eq!(
            apply_prim(Kind::Equal, vec![p.clone(), p.clone()]).unwrap(),
            Cell::tag(Kind::True)
        );
        assert_eq!(
            apply_prim(Kind::Equal, vec![p, q]).unwrap(),
            Cell::tag(Kind::False)
        );
    }

    #[test]
    fn and_returns_the_deciding_operand() {
        let out = apply_prim(
            Kind::And,
            vec![num(1.0), Cell::tag(Kind::False), Cell::tag(Kind::True)],
        )
        .unwrap();
        assert_eq!(out, Cell::tag(Kind::False));
        // all truthy but none False: a fresh True
        assert_eq!(
            apply_prim(Kind::And, vec![num(1.0), num(2.0)]).unwrap(),
            Cell::tag(Kind::True)
        );
    }

    #[test]
    fn or_looks_for_a_true_cell() {
        assert_eq!(
            apply_prim(Kind::Or, vec![Cell::tag(Kind::False), Cell::tag(Kind::True)]).unwrap(),
            Cell::tag(Kind::True)
        );
        // numbers are truthy but are not True cells
        assert_eq!(
            apply_prim(Kind::Or, vec![num(1.0), num(2.0)]).unwrap(),
            Cell::tag(Kind::False)
        );
    }

    #[test]
    fn not_inverts_only_false() {
        assert_eq!(
            apply_prim(Kind::Not, vec![Cell::tag(Kind::False)]).unwrap(),
            Cell::tag(Kind::True)
        );
        assert_eq!(
            apply_prim(Kind::Not, vec![num(0.0)]).unwrap(),
            Cell::tag(Kind::False)
        );
    }

    #[test]
    fn list_and_cons_package_their_arguments() {
        let out = apply_prim(Kind::Cons, vec![num(1.0), num(2.0)]).unwrap();
        assert_eq!(out, Cell::Expr(vec![num(1.0), num(2.0)]));
        let out = apply_prim(Kind::List, vec![num(1.0), num(2.0), num(3.0)]).unwrap();
        assert_eq!(out, Cell::Expr(vec![num(1.0), num(2.0), num(3.0)]));
    }

    #[test]
    fn car_takes_the_head_and_passes_atoms_through() {
        let list = Cell::Expr(vec![num(1.0), num(2.0)]);
        assert_eq!(apply_prim(Kind::Car, vec![list]).unwrap(), num(1.0));
        assert_eq!(apply_prim(Kind::Car, vec![num(7.0)]).unwrap(), num(7.0));
    }

    #[test]
    fn cdr_ladder() {
        let empty = Cell::Expr(vec![]);
        // non-list and single-element list both give the empty list
        assert_eq!(apply_prim(Kind::Cdr, vec![num(1.0)]).unwrap(), empty);
        assert_eq!(
            apply_prim(Kind::Cdr, vec![Cell::Expr(vec![num(1.0)])]).unwrap(),
            empty
        );
        // two elements: the second element itself
        assert_eq!(
            apply_prim(Kind::Cdr, vec![Cell::Expr(vec![num(1.0), num(2.0)])]).unwrap(),
            num(2.0)
        );
        // longer: the tail as a list
        assert_eq!(
            apply_prim(
                Kind::Cdr,
                vec![Cell::Expr(vec![num(1.0), num(2.0), num(3.0)])]
            )
            .unwrap(),
            Cell::Expr(vec![num(2.0), num(3.0)])
        );
    }

    #[test]
    fn empty_checks_for_a_zero_length_list() {
        assert_eq!(
            apply_prim(Kind::Empty, vec![Cell::Expr(vec![])]).unwrap(),
            Cell::tag(Kind::True)
        );
        assert_eq!(
            apply_prim(Kind::Empty, vec![Cell::Expr(vec![num(1.0)])]).unwrap(),
            Cell::tag(Kind::False)
        );
        assert_eq!(
            apply_prim(Kind::Empty, vec![num(1.0)]).unwrap(),
            Cell::tag(Kind::False)
        );
    }

    #[test]
    fn car_cons_round_trip() {
        let cons = apply_prim(Kind::Cons, vec![num(4.0), num(5.0)]).unwrap();
        assert_eq!(apply_prim(Kind::Car, vec![cons]).unwrap(), num(4.0));
    }
}
