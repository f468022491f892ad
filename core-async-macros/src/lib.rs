//! Attribute macros re-exported by `core-async`.
//!
//! `#[core_async::test]` turns an `async fn` into a `#[test]` that drives the
//! body on a fresh current-thread runtime. `#[core_async::test(start_paused)]`
//! does the same with the runtime clock paused, so timer-heavy tests run
//! instantly and deterministically. `#[core_async::main]` is the binary
//! entry-point equivalent.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Ident, ItemFn};

#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, MacroKind::Test)
}

#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, MacroKind::Main)
}

enum MacroKind {
    Test,
    Main,
}

/// Clock mode requested through the attribute arguments.
enum Clock {
    Real,
    Paused,
}

fn parse_clock(attr: TokenStream2) -> syn::Result<Clock> {
    if attr.is_empty() {
        return Ok(Clock::Real);
    }

    let ident: Ident = syn::parse2(attr.clone())
        .map_err(|_| syn::Error::new_spanned(&attr, "expected `start_paused` or nothing"))?;

    if ident == "start_paused" {
        Ok(Clock::Paused)
    } else {
        Err(syn::Error::new_spanned(
            ident,
            "unknown core_async attribute argument; only `start_paused` is supported",
        ))
    }
}

fn expand(attr: TokenStream, item: TokenStream, kind: MacroKind) -> TokenStream {
    let clock = match parse_clock(TokenStream2::from(attr)) {
        Ok(clock) => clock,
        Err(err) => return err.to_compile_error().into(),
    };

    let input = parse_macro_input!(item as ItemFn);

    if input.sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            input.sig.fn_token,
            "core_async attribute macros require `async fn`",
        )
        .to_compile_error()
        .into();
    }

    if matches!(kind, MacroKind::Main) && matches!(clock, Clock::Paused) {
        return syn::Error::new_spanned(
            input.sig.ident,
            "`start_paused` is only available on #[core_async::test]",
        )
        .to_compile_error()
        .into();
    }

    let mut sync_sig = input.sig.clone();
    sync_sig.asyncness = None;

    let attrs = input.attrs;
    let vis = input.vis;
    let block = input.block;

    let runner = match clock {
        Clock::Real => quote!(core_async::runtime::block_on),
        Clock::Paused => quote!(core_async::runtime::block_on_paused),
    };

    let test_attr = match kind {
        MacroKind::Test => quote!(#[test]),
        MacroKind::Main => quote!(),
    };

    quote! {
        #(#attrs)*
        #test_attr
        #vis #sync_sig {
            #runner(async move #block)
        }
    }
    .into()
}
