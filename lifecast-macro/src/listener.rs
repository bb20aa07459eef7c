use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parenthesized, parse::Parse, parse::ParseStream, parse_macro_input, parse_quote, Ident,
    ImplItem, ItemImpl, Token,
};

const EVENT_TYPES: &[&str] = &[
    "Starting",
    "EnvironmentPrepared",
    "ContextInitialized",
    "Prepared",
    "Started",
    "Ready",
    "Failed",
    "AvailabilityChange",
    "ContextClosed",
];

const PAYLOAD_TYPES: &[&str] = &["Liveness", "Readiness"];

struct ListenerArgs {
    events: Option<Vec<Ident>>,
    payloads: Option<Vec<Ident>>,
}

impl Parse for ListenerArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut events = None;
        let mut payloads = None;

        while !input.is_empty() {
            let key: Ident = input.parse()?;
            let content;
            parenthesized!(content in input);
            let names: Vec<Ident> = content
                .parse_terminated(Ident::parse, Token![,])?
                .into_iter()
                .collect();

            if key == "events" {
                events = Some(resolve(names, EVENT_TYPES, "event")?);
            } else if key == "payloads" {
                payloads = Some(resolve(names, PAYLOAD_TYPES, "payload")?);
            } else {
                return Err(syn::Error::new(
                    key.span(),
                    "expected `events(...)` or `payloads(...)`",
                ));
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(ListenerArgs { events, payloads })
    }
}

/// Map `environment_prepared` or `EnvironmentPrepared` to the variant ident.
fn resolve(names: Vec<Ident>, known: &[&str], kind: &str) -> syn::Result<Vec<Ident>> {
    if names.is_empty() {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            format!("expected at least one {} type", kind),
        ));
    }

    names
        .into_iter()
        .map(|name| {
            let variant = to_variant(&name.to_string());
            if known.contains(&variant.as_str()) {
                Ok(Ident::new(&variant, name.span()))
            } else {
                Err(syn::Error::new(
                    name.span(),
                    format!("unknown {} type `{}`", kind, name),
                ))
            }
        })
        .collect()
}

fn to_variant(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}

fn defines(input: &ItemImpl, method: &str) -> bool {
    input.items.iter().any(|item| match item {
        ImplItem::Fn(f) => f.sig.ident == method,
        _ => false,
    })
}

pub fn listener_attribute(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ListenerArgs);
    let mut input = parse_macro_input!(item as ItemImpl);

    let is_listener_impl = input
        .trait_
        .as_ref()
        .and_then(|(_, path, _)| path.segments.last())
        .is_some_and(|segment| segment.ident == "ApplicationListener");
    if !is_listener_impl {
        return syn::Error::new_spanned(
            &input.self_ty,
            "#[listener] can only be used on `impl ApplicationListener for ...` blocks",
        )
        .to_compile_error()
        .into();
    }

    if let Some(events) = &args.events {
        if defines(&input, "supported_events") {
            return syn::Error::new_spanned(
                &input.self_ty,
                "`supported_events` is already defined; remove it or drop `events(...)`",
            )
            .to_compile_error()
            .into();
        }
        input.items.push(parse_quote! {
            fn supported_events(&self) -> &'static [::lifecast::event::EventType] {
                &[#(::lifecast::event::EventType::#events),*]
            }
        });
    }

    if let Some(payloads) = &args.payloads {
        if defines(&input, "supported_payloads") {
            return syn::Error::new_spanned(
                &input.self_ty,
                "`supported_payloads` is already defined; remove it or drop `payloads(...)`",
            )
            .to_compile_error()
            .into();
        }
        input.items.push(parse_quote! {
            fn supported_payloads(&self) -> ::std::option::Option<&'static [::lifecast::event::PayloadType]> {
                ::std::option::Option::Some(&[#(::lifecast::event::PayloadType::#payloads),*])
            }
        });
    }

    TokenStream::from(quote! {
        #input
    })
}
