use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{parenthesized, parse_macro_input, FnArg, Ident, ItemFn, Pat, ReturnType, Token, Type};

// #[log(debug)], #[log(trace)] or #[log(trace, skip(arg, ...))]
//
// Both levels log entry and exit of the call together with the time it took.
// debug describes the arguments by type; trace, when the installed logger is
// at Trace, prints argument values and the returned value instead. Arguments
// and return types must implement Debug for trace, unless listed in skip.

#[derive(Clone, Copy, Eq, PartialEq)]
enum CallLogLevel {
    Trace,
    Debug,
}

struct LogAttr {
    level: CallLogLevel,
    skip: Vec<Ident>,
}

impl Parse for LogAttr {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let level_ident: Ident = input.parse()?;
        let level = match level_ident.to_string().to_lowercase().as_str() {
            "trace" => CallLogLevel::Trace,
            "debug" => CallLogLevel::Debug,
            other => {
                return Err(syn::Error::new(
                    level_ident.span(),
                    format!("invalid log level `{}`, expected trace or debug", other),
                ))
            }
        };

        let mut skip = Vec::new();
        while input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            let option: Ident = input.parse()?;
            if option != "skip" {
                return Err(syn::Error::new(option.span(), "expected `skip(...)`"));
            }
            let content;
            parenthesized!(content in input);
            let names: Punctuated<Ident, Token![,]> = content.parse_terminated(Ident::parse, Token![,])?;
            skip.extend(names);
        }
        Ok(LogAttr { level, skip })
    }
}

/// `name: Type` for every plain identifier argument, or `name: value` when
/// `with_values` is set and the argument is not skipped.
fn describe_args(func: &ItemFn, with_values: bool, skip: &[Ident]) -> TokenStream2 {
    let parts = func.sig.inputs.iter().filter_map(|arg| {
        let FnArg::Typed(typed) = arg else { return None };
        let Pat::Ident(pat_ident) = &*typed.pat else { return None };
        let name = &pat_ident.ident;
        let ty = &typed.ty;
        if !with_values {
            Some(quote! { format!("{}: {}", stringify!(#name), stringify!(#ty)) })
        } else if skip.contains(name) {
            Some(quote! { format!("{}: _", stringify!(#name)) })
        } else {
            Some(quote! { format!("{}: {:?}", stringify!(#name), #name) })
        }
    });
    quote! { { let parts: Vec<String> = vec![#(#parts),*]; parts.join(", ") } }
}

#[proc_macro_attribute]
pub fn log(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr = parse_macro_input!(attr as LogAttr);
    let func = parse_macro_input!(item as ItemFn);

    let fn_name = &func.sig.ident;
    let body = &func.block;
    // closures cannot name `impl Trait`, leave those to inference
    let output = match &func.sig.output {
        ReturnType::Default => quote! { -> () },
        ReturnType::Type(_, ty) if matches!(**ty, Type::ImplTrait(_)) => quote! {},
        ReturnType::Type(_, ty) => quote! { -> #ty },
    };

    let arg_types = describe_args(&func, false, &attr.skip);
    let enter_debug = quote! {
        ::logger::debug!("-> {}::{}({})", module_path!(), stringify!(#fn_name), #arg_types);
    };
    let exit_debug = quote! {
        ::logger::debug!("<- {}::{} after {:?}", module_path!(), stringify!(#fn_name), __call_started.elapsed());
    };

    let (enter, exit) = match attr.level {
        CallLogLevel::Debug => (enter_debug, exit_debug),
        CallLogLevel::Trace => {
            let arg_values = describe_args(&func, true, &attr.skip);
            (
                quote! {
                    let __call_traced = ::logger::level_enabled(::logger::LogLevel::Trace);
                    if __call_traced {
                        ::logger::trace!("-> {}::{}({})", module_path!(), stringify!(#fn_name), #arg_values);
                    } else {
                        #enter_debug
                    }
                },
                quote! {
                    if __call_traced {
                        ::logger::trace!("<- {}::{} = {:?} after {:?}",
                                         module_path!(), stringify!(#fn_name), result, __call_started.elapsed());
                    } else {
                        #exit_debug
                    }
                },
            )
        }
    };

    let attrs = &func.attrs;
    let vis = &func.vis;
    let sig = &func.sig;

    // the closure keeps `?` and `return` in the body typed as the function's output
    quote! {
        #(#attrs)* #vis #sig {
            let __call_started = ::std::time::Instant::now();
            #enter
            let result = (move || #output #body)();
            #exit
            result
        }
    }
    .into()
}
