extern crate proc_macro;

use proc_macro2::TokenStream;
use quote::{
    format_ident, quote,
};
use syn::{
    parse::{
        Parse, ParseStream,
    },
    Ident, Index, LitInt,
    parse_macro_input,
    Token,
};

struct ImplTuples {
    implementor: Ident,
    min: usize,
    max: usize,
}

impl Parse for ImplTuples {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let implementor = input.parse()?;
        input.parse::<Token![!]>()?;

        let first = input.parse::<LitInt>()?.base10_parse::<usize>()?;
        let (min, max) = match input.parse::<Option<LitInt>>()? {
            Some(second) => (first, second.base10_parse::<usize>()?),
            None => (0, first),
        };

        if min > max {
            return Err(input.error(format!("empty arity range `{min}..={max}`")));
        }

        Ok(Self { implementor, min, max, })
    }
}

/// Invokes a `macro_rules!` macro once per tuple arity, passing `T0 0, T1 1, ..` pairs of type
/// parameter and field index. `impl_tuples!(my_macro! 8)` covers arities `0..=8`, while
/// `impl_tuples!(my_macro! 1 8)` skips the unit tuple.
///
/// ```
/// use kin_common_macros::impl_tuples;
///
/// trait Arity {
///     const ARITY: usize;
/// }
///
/// macro_rules! impl_arity {
///     ($($tuple_type:ident $tuple_index:tt),*) => {
///         impl<$($tuple_type,)*> Arity for ($($tuple_type,)*) {
///             const ARITY: usize = 0 $(+ { let _ = $tuple_index; 1 })*;
///         }
///     };
/// } impl_tuples!(impl_arity! 4);
///
/// assert_eq!(<(u8, u16, u32)>::ARITY, 3);
/// ```
#[proc_macro]
pub fn impl_tuples(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ImplTuples { implementor, min, max } = parse_macro_input!(input as ImplTuples);

    let invocations = (min..=max).map(|arity| {
        let params = (0..arity).map(|i| {
            let ty = format_ident!("T{i}");
            let index = Index::from(i);
            quote! { #ty #index }
        });

        quote! { #implementor!(#(#params),*); }
    });

    let output: TokenStream = quote! { #(#invocations)* };
    output.into()
}
