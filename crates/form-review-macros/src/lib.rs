use proc_macro::TokenStream;

use quote::quote;
use syn::{
    Attribute, Expr, ExprArray, ExprLit, ExprPath, ItemStruct, Lit, Meta, Token, parse::Parser,
    spanned::Spanned,
};

#[proc_macro_attribute]
#[allow(non_snake_case)]
pub fn Rule(attr: TokenStream, item: TokenStream) -> TokenStream {
    match rule_impl(attr, item) {
        Ok(ts) => ts,
        Err(e) => e.to_compile_error().into(),
    }
}

#[proc_macro_attribute]
#[allow(non_snake_case)]
pub fn Format(attr: TokenStream, item: TokenStream) -> TokenStream {
    match format_impl(attr, item) {
        Ok(ts) => ts,
        Err(e) => e.to_compile_error().into(),
    }
}

fn lit_str(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        _ => Err(syn::Error::new(expr.span(), "expected string literal")),
    }
}

fn lit_bool(expr: &Expr) -> syn::Result<bool> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Bool(b), ..
        }) => Ok(b.value),
        _ => Err(syn::Error::new(expr.span(), "expected bool literal")),
    }
}

fn expr_array_paths(expr: &Expr) -> syn::Result<Vec<syn::Path>> {
    let Expr::Array(ExprArray { elems, .. }) = expr else {
        return Err(syn::Error::new(expr.span(), "expected array literal"));
    };
    let mut out = Vec::new();
    for e in elems {
        match e {
            Expr::Path(ExprPath { path, .. }) => out.push(path.clone()),
            _ => return Err(syn::Error::new(e.span(), "expected path (identifier)")),
        }
    }
    Ok(out)
}

fn drop_our_attrs(attrs: &[Attribute]) -> Vec<Attribute> {
    attrs
        .iter()
        .filter(|a| {
            let Meta::Path(p) = &a.meta else {
                return true;
            };
            let Some(ident) = p.get_ident() else {
                return true;
            };
            ident != "Rule" && ident != "Format"
        })
        .cloned()
        .collect()
}

struct HandlerMeta {
    id: String,
    kinds: Vec<syn::Path>,
    fallback: bool,
}

fn parse_handler_meta(
    attr: TokenStream,
    what: &str,
    span: proc_macro2::Span,
) -> syn::Result<HandlerMeta> {
    let parser = syn::punctuated::Punctuated::<Meta, Token![,]>::parse_terminated;
    let metas = parser.parse(attr)?;

    let mut id: Option<String> = None;
    let mut kinds: Vec<syn::Path> = Vec::new();
    let mut fallback = false;

    for m in metas {
        let Meta::NameValue(nv) = m else {
            return Err(syn::Error::new(m.span(), "expected key = value"));
        };
        let Some(key) = nv.path.get_ident().map(|i| i.to_string()) else {
            return Err(syn::Error::new(nv.path.span(), "expected ident key"));
        };
        let v = &nv.value;
        match key.as_str() {
            "id" => id = Some(lit_str(v)?),
            "kinds" => kinds = expr_array_paths(v)?,
            "fallback" => fallback = lit_bool(v)?,
            other => {
                return Err(syn::Error::new(
                    nv.path.span(),
                    format!("unknown {what} attribute key '{other}'"),
                ));
            }
        }
    }

    let id = id.ok_or_else(|| syn::Error::new(span, format!("{what}: missing id")))?;
    if kinds.is_empty() && !fallback {
        return Err(syn::Error::new(
            span,
            format!("{what}: kinds is empty and fallback is not set"),
        ));
    }

    Ok(HandlerMeta {
        id,
        kinds,
        fallback,
    })
}

fn applies_body(meta: &HandlerMeta) -> proc_macro2::TokenStream {
    if meta.fallback {
        quote! {
            let _ = kind;
            true
        }
    } else {
        let kinds = &meta.kinds;
        quote! { matches!(kind, #(crate::kind::FieldKind::#kinds)|*) }
    }
}

fn rule_impl(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let mut st: ItemStruct = syn::parse(item)?;
    st.attrs = drop_our_attrs(&st.attrs);
    let struct_ident = st.ident.clone();

    let meta = parse_handler_meta(attr, "Rule", struct_ident.span())?;
    let id_lit = meta.id.clone();
    let applies = applies_body(&meta);

    let expanded = quote! {
        #st

        impl crate::validation::ValidityRule for #struct_ident {
            fn id(&self) -> &'static str {
                #id_lit
            }

            fn applies(&self, kind: crate::kind::FieldKind) -> bool {
                #applies
            }

            // Rules define their behavior by implementing:
            // `fn run(tree: &crate::tree::FieldTree, id: crate::tree::NodeId) -> crate::Result<Vec<String>>`
            fn check(
                &self,
                tree: &crate::tree::FieldTree,
                id: crate::tree::NodeId,
            ) -> crate::Result<Vec<String>> {
                Self::run(tree, id)
            }
        }
    };

    Ok(expanded.into())
}

fn format_impl(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let mut st: ItemStruct = syn::parse(item)?;
    st.attrs = drop_our_attrs(&st.attrs);
    let struct_ident = st.ident.clone();

    let meta = parse_handler_meta(attr, "Format", struct_ident.span())?;
    let id_lit = meta.id.clone();
    let applies = applies_body(&meta);

    let expanded = quote! {
        #st

        impl crate::format::FormatRule for #struct_ident {
            fn id(&self) -> &'static str {
                #id_lit
            }

            fn applies(&self, kind: crate::kind::FieldKind) -> bool {
                #applies
            }

            // Formatters define their behavior by implementing:
            // `fn run(tree: &crate::tree::FieldTree, id: crate::tree::NodeId, opts: &crate::config::RenderOptions) -> Option<crate::format::Formatted>`
            fn format(
                &self,
                tree: &crate::tree::FieldTree,
                id: crate::tree::NodeId,
                opts: &crate::config::RenderOptions,
            ) -> Option<crate::format::Formatted> {
                Self::run(tree, id, opts)
            }
        }
    };

    Ok(expanded.into())
}
