use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::{braced, token, Attribute, Expr, Ident, LitBool, LitByteStr, LitStr, Meta, Result, Token, Visibility};

use proc_macro_crate::{crate_name, FoundCrate};

/// Maximum class path length, mirrors `bevy_token::MAX_DEPTH`.
const MAX_DEPTH: usize = 8;

/// Names taken by the items every class module defines.
const RESERVED: &[&str] = &["Class", "ID", "PATH", "NAME"];

/// Class modules sit next to the `Class` marker of their parent.
const RESERVED_CLASSES: &[&str] = &["Class"];

/// `#[root]`, `#[root(int_index)]`, `#[root(string_index = false, int_index = true)]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RootAttr {
    string_index: bool,
    int_index: bool,
}

impl Default for RootAttr {
    fn default() -> Self {
        Self {
            string_index: true,
            int_index: false,
        }
    }
}

/// Parsed attributes of a class or token.
#[derive(Default)]
struct ItemAttrs {
    root: Option<RootAttr>,
    float: Option<Expr>,
    /// `#[doc]` and `#[deprecated]`, forwarded as written.
    passthrough: Vec<Attribute>,
}

struct TokenItem {
    name: Ident,
    attrs: ItemAttrs,
    int: Option<Expr>,
}

struct ClassNode {
    name: Ident,
    attrs: ItemAttrs,
    items: Vec<Item>,
}

enum Item {
    Class(ClassNode),
    Token(TokenItem),
}

impl ClassNode {
    fn classes(&self) -> impl Iterator<Item = &ClassNode> {
        self.items.iter().filter_map(|item| match item {
            Item::Class(class) => Some(class),
            Item::Token(_) => None,
        })
    }

    fn tokens(&self) -> impl Iterator<Item = &TokenItem> {
        self.items.iter().filter_map(|item| match item {
            Item::Token(token) => Some(token),
            Item::Class(_) => None,
        })
    }
}

struct HierarchyInput {
    vis: Visibility,
    root: Ident,
    classes: Vec<ClassNode>,
}

impl Parse for HierarchyInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let vis: Visibility = input.parse()?;
        input.parse::<Token![mod]>()?;
        let root: Ident = input.parse()?;
        let content;
        braced!(content in input);

        let mut classes = Vec::new();
        for item in parse_items(&content)? {
            match item {
                Item::Class(class) => classes.push(class),
                Item::Token(token) => {
                    return Err(syn::Error::new(
                        token.name.span(),
                        "tokens must be declared inside a class",
                    ));
                }
            }
        }

        check_siblings(classes.iter())?;
        for class in &classes {
            validate_class(class, 1)?;
        }
        Ok(Self { vis, root, classes })
    }
}

fn parse_items(input: ParseStream) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    while !input.is_empty() {
        let attrs = input.call(Attribute::parse_outer)?;
        let name: Ident = input.parse()?;

        if input.peek(token::Brace) {
            let attrs = parse_attrs(attrs, true)?;
            let content;
            braced!(content in input);
            let items_inner = parse_items(&content)?;
            items.push(Item::Class(ClassNode {
                name,
                attrs,
                items: items_inner,
            }));
        } else {
            let attrs = parse_attrs(attrs, false)?;
            let int = if input.peek(Token![=]) {
                input.parse::<Token![=]>()?;
                Some(input.parse::<Expr>()?)
            } else {
                None
            };
            input.parse::<Token![;]>()?;
            items.push(Item::Token(TokenItem { name, attrs, int }));
        }
    }
    Ok(items)
}

fn parse_attrs(attrs: Vec<Attribute>, is_class: bool) -> Result<ItemAttrs> {
    let mut out = ItemAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("doc") || attr.path().is_ident("deprecated") {
            out.passthrough.push(attr);
        } else if attr.path().is_ident("root") {
            if !is_class {
                return Err(syn::Error::new_spanned(&attr, "`#[root]` applies to classes only"));
            }
            out.root = Some(parse_root(&attr)?);
        } else if attr.path().is_ident("float") {
            if is_class {
                return Err(syn::Error::new_spanned(&attr, "`#[float]` applies to tokens only"));
            }
            match &attr.meta {
                Meta::NameValue(nv) => out.float = Some(nv.value.clone()),
                _ => return Err(syn::Error::new_spanned(&attr, "expected `#[float = <expr>]`")),
            }
        } else {
            return Err(syn::Error::new_spanned(
                attr.path(),
                "unsupported attribute, expected `root`, `float`, `deprecated` or `doc`",
            ));
        }
    }

    Ok(out)
}

fn parse_root(attr: &Attribute) -> Result<RootAttr> {
    let mut root = RootAttr::default();
    if let Meta::Path(_) = attr.meta {
        return Ok(root);
    }

    attr.parse_nested_meta(|meta| {
        // A bare flag means `true`.
        let flag = if meta.input.peek(Token![=]) {
            meta.value()?.parse::<LitBool>()?.value
        } else {
            true
        };

        if meta.path.is_ident("string_index") {
            root.string_index = flag;
            Ok(())
        } else if meta.path.is_ident("int_index") {
            root.int_index = flag;
            Ok(())
        } else {
            Err(meta.error("expected `string_index` or `int_index`"))
        }
    })?;

    Ok(root)
}

// =============================================================================
// Validation (runs at macro expansion time)
// =============================================================================

fn segment(ident: &Ident) -> String {
    ident.unraw().to_string()
}

fn check_siblings<'a>(classes: impl Iterator<Item = &'a ClassNode>) -> Result<()> {
    let mut seen: Vec<String> = Vec::new();
    for class in classes {
        let name = segment(&class.name);
        if RESERVED_CLASSES.contains(&name.as_str()) {
            return Err(syn::Error::new(
                class.name.span(),
                format!("`{name}` is reserved for the class marker type"),
            ));
        }
        if seen.contains(&name) {
            return Err(syn::Error::new(
                class.name.span(),
                format!("duplicate class `{name}`"),
            ));
        }
        seen.push(name);
    }
    Ok(())
}

fn validate_class(class: &ClassNode, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(syn::Error::new(
            class.name.span(),
            format!("class depth ({depth}) exceeds maximum ({MAX_DEPTH})"),
        ));
    }

    let mut names: Vec<String> = Vec::new();
    for token in class.tokens() {
        let name = segment(&token.name);
        if RESERVED.contains(&name.as_str()) {
            return Err(syn::Error::new(
                token.name.span(),
                format!("`{name}` is reserved inside a class module"),
            ));
        }
        if names.contains(&name) {
            return Err(syn::Error::new(
                token.name.span(),
                format!("duplicate token `{name}` in class `{}`", segment(&class.name)),
            ));
        }
        names.push(name);
    }

    check_siblings(class.classes())?;
    for child in class.classes() {
        validate_class(child, depth + 1)?;
    }
    Ok(())
}

// =============================================================================
// Crate path resolution
// =============================================================================

fn token_crate_path() -> TokenStream2 {
    match crate_name("bevy-token") {
        Ok(FoundCrate::Itself) | Err(_) => quote!(::bevy_token),
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
    }
}

// =============================================================================
// Code generation
// =============================================================================

/// `ClassId` computed at compile time from path segments.
fn class_id_expr(segments: &[String], krate: &TokenStream2) -> TokenStream2 {
    let count = segments.len();
    let lits: Vec<LitByteStr> = segments
        .iter()
        .map(|s| LitByteStr::new(s.as_bytes(), Span::call_site()))
        .collect();
    quote! {{
        const SEGS: [&[u8]; #count] = [#(#lits),*];
        #krate::ClassId::from_segments(&SEGS)
    }}
}

/// One module per class: `struct Class`, `ID`/`PATH`/`NAME`, one `TokenKey`
/// per token, then nested modules for subclasses.
fn class_module(class: &ClassNode, parent: &[String], krate: &TokenStream2) -> TokenStream2 {
    let mut segments = parent.to_vec();
    segments.push(segment(&class.name));

    let ident = &class.name;
    let attrs = &class.attrs.passthrough;
    let path_lit = LitStr::new(&segments.join("."), Span::call_site());
    let name_lit = LitStr::new(&segment(&class.name), Span::call_site());
    let id = class_id_expr(&segments, krate);

    let tokens: Vec<TokenStream2> = class
        .tokens()
        .map(|token| {
            let token_ident = &token.name;
            let token_attrs = &token.attrs.passthrough;
            let token_lit = LitStr::new(&segment(&token.name), token.name.span());
            let int = match &token.int {
                Some(expr) => quote!(::core::option::Option::Some(#expr)),
                None => quote!(::core::option::Option::None),
            };
            quote! {
                #(#token_attrs)*
                pub const #token_ident: #krate::TokenKey =
                    #krate::TokenKey::new(#krate::ClassRef::from_parts(ID, PATH), #token_lit, #int);
            }
        })
        .collect();

    let children: Vec<TokenStream2> = class
        .classes()
        .map(|child| class_module(child, &segments, krate))
        .collect();

    quote! {
        #(#attrs)*
        #[allow(non_snake_case, non_upper_case_globals)]
        pub mod #ident {
            #[allow(unused_imports)]
            use super::*;

            /// Marker type for this token class.
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
            pub struct Class;

            impl #krate::TokenClassDef for Class {
                const PATH: &'static str = #path_lit;
                const ID: #krate::ClassId = ID;
            }

            pub const ID: #krate::ClassId = #id;
            pub const PATH: &'static str = #path_lit;
            pub const NAME: &'static str = #name_lit;

            #(#tokens)*

            #(#children)*
        }
    }
}

/// `Definition` entries in declaration order: a class, then its tokens and
/// subclasses as written.
fn collect_defs(class: &ClassNode, parent: &[String], krate: &TokenStream2, out: &mut Vec<TokenStream2>) {
    let mut segments = parent.to_vec();
    segments.push(segment(&class.name));
    let path_lit = LitStr::new(&segments.join("."), Span::call_site());

    let root = match class.attrs.root {
        Some(RootAttr {
            string_index,
            int_index,
        }) => quote!(::core::option::Option::Some(#krate::RootOptions::new(#string_index, #int_index))),
        None => quote!(::core::option::Option::None),
    };
    out.push(quote! {
        #krate::Definition::Class { path: #path_lit, root: #root }
    });

    for item in &class.items {
        match item {
            Item::Token(token) => {
                let token_lit = LitStr::new(&segment(&token.name), token.name.span());
                let int = token.int.as_ref().map(|expr| quote!(.with_int(#expr)));
                let float = token.attrs.float.as_ref().map(|expr| quote!(.with_float(#expr)));
                out.push(quote! {
                    #krate::Definition::Token(#krate::TokenDef::new(#path_lit, #token_lit) #int #float)
                });
            }
            Item::Class(child) => collect_defs(child, &segments, krate, out),
        }
    }
}

fn count_classes(classes: &[ClassNode]) -> usize {
    fn walk(class: &ClassNode) -> usize {
        1 + class.classes().map(walk).sum::<usize>()
    }
    classes.iter().map(walk).sum()
}

fn count_tokens(classes: &[ClassNode]) -> usize {
    fn walk(class: &ClassNode) -> usize {
        class.tokens().count() + class.classes().map(walk).sum::<usize>()
    }
    classes.iter().map(walk).sum()
}

fn expand(input: &HierarchyInput, krate: &TokenStream2) -> TokenStream2 {
    let vis = &input.vis;
    let root = &input.root;

    let class_count = count_classes(&input.classes);
    let token_count = count_tokens(&input.classes);

    let mut defs = Vec::new();
    for class in &input.classes {
        collect_defs(class, &[], krate, &mut defs);
    }

    let modules: Vec<TokenStream2> = input
        .classes
        .iter()
        .map(|class| class_module(class, &[], krate))
        .collect();

    quote! {
        #[allow(non_snake_case, non_camel_case_types)]
        #vis mod #root {
            #[allow(unused_imports)]
            use super::*;

            /// Number of classes declared in this hierarchy.
            pub const CLASS_COUNT: usize = #class_count;

            /// Number of tokens declared in this hierarchy.
            pub const TOKEN_COUNT: usize = #token_count;

            /// Flat definition table, in declaration order (for `Registry::install`).
            pub const DEFINITIONS: &'static [#krate::Definition] = &[
                #(#defs),*
            ];

            #(#modules)*
        }
    }
}

// =============================================================================
// Entry point
// =============================================================================

/// Declare a closed hierarchy of token classes and their tokens.
///
/// ```ignore
/// token_hierarchy! {
///     pub mod StatusTokens {
///         #[root(int_index)]
///         Status {
///             Success { COMPLETED = 0; PAUSED = 1; }
///             Error {
///                 #[float = 0.5]
///                 MECHANICAL_ERROR = 10;
///                 #[deprecated(note = "use MECHANICAL_ERROR")]
///                 HARDWARE_ERROR = 12;
///                 USER_ERROR = 11;
///             }
///         }
///     }
/// }
///
/// // Generates:
/// pub mod StatusTokens {
///     pub const DEFINITIONS: &[Definition] = &[..];
///     pub mod Status {
///         pub struct Class;                // impl TokenClassDef
///         pub const ID: ClassId = ..;
///         pub mod Success {
///             pub const COMPLETED: TokenKey = ..;
///             ..
///         }
///         ..
///     }
/// }
/// ```
#[proc_macro]
pub fn token_hierarchy(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as HierarchyInput);
    expand(&input, &token_crate_path()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(tokens: TokenStream2) -> Result<HierarchyInput> {
        syn::parse2(tokens)
    }

    fn expand_str(tokens: TokenStream2) -> String {
        let input = parse(tokens).unwrap();
        expand(&input, &quote!(::bevy_token)).to_string()
    }

    #[test]
    fn parses_classes_and_tokens() {
        let input = parse(quote! {
            pub mod StatusTokens {
                #[root(int_index)]
                Status {
                    Success { COMPLETED = 0; PAUSED = 1; }
                    Error { #[float = 0.5] MECHANICAL_ERROR = 10; USER_ERROR = 11; }
                }
            }
        })
        .unwrap();

        assert_eq!(input.root, "StatusTokens");
        assert_eq!(input.classes.len(), 1);

        let status = &input.classes[0];
        assert_eq!(
            status.attrs.root,
            Some(RootAttr {
                string_index: true,
                int_index: true
            })
        );
        assert_eq!(status.classes().count(), 2);
        assert_eq!(status.tokens().count(), 0);

        assert_eq!(count_classes(&input.classes), 3);
        assert_eq!(count_tokens(&input.classes), 4);
    }

    #[test]
    fn root_flags() {
        let input = parse(quote! {
            mod T {
                #[root] A { X; }
                #[root(string_index = false, int_index = true)] B { Y; }
                C { Z; }
            }
        })
        .unwrap();

        assert_eq!(input.classes[0].attrs.root, Some(RootAttr::default()));
        assert_eq!(
            input.classes[1].attrs.root,
            Some(RootAttr {
                string_index: false,
                int_index: true
            })
        );
        assert_eq!(input.classes[2].attrs.root, None);
    }

    #[test]
    fn same_name_under_different_parents_no_conflict() {
        let code = expand_str(quote! {
            pub mod Tokens {
                Comparison { Existence { EX; } }
                LogEvent { Existence { EX; } }
            }
        });

        assert!(code.contains("pub mod Comparison"));
        assert!(code.contains("pub mod LogEvent"));
        assert!(code.contains("\"Comparison.Existence\""));
        assert!(code.contains("\"LogEvent.Existence\""));
        assert!(!code.contains("pub use"));
    }

    #[test]
    fn definitions_follow_declaration_order() {
        let input = parse(quote! {
            mod T {
                A { X; B { Y; } Z; }
            }
        })
        .unwrap();

        let mut defs = Vec::new();
        collect_defs(&input.classes[0], &[], &quote!(::bevy_token), &mut defs);
        let rendered: Vec<String> = defs.iter().map(ToString::to_string).collect();

        assert_eq!(rendered.len(), 5);
        assert!(rendered[0].contains("Class") && rendered[0].contains("\"A\""));
        assert!(rendered[1].contains("\"X\""));
        assert!(rendered[2].contains("Class") && rendered[2].contains("\"A.B\""));
        assert!(rendered[3].contains("\"Y\""));
        assert!(rendered[4].contains("\"Z\""));
    }

    #[test]
    fn deprecated_and_docs_are_forwarded() {
        let code = expand_str(quote! {
            mod T {
                /// Queue states.
                Queue {
                    #[deprecated(note = "use EMPTY")]
                    DRAINED;
                    EMPTY;
                }
            }
        });

        assert!(code.contains("deprecated"));
        assert!(code.contains("\"use EMPTY\""));
        assert!(code.contains("Queue states."));
    }

    #[test]
    fn token_keys_carry_the_class_path() {
        let code = expand_str(quote! {
            mod T { C55 { EQ; } C84 { EQ; } }
        });
        assert!(code.contains("from_parts"));
        assert!(!code.contains("const _"));
    }

    fn error_of(tokens: TokenStream2) -> String {
        match parse(tokens) {
            Ok(_) => panic!("expected a parse error"),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn rejects_top_level_tokens() {
        let err = error_of(quote! { mod T { LOOSE; } });
        assert!(err.contains("inside a class"));
    }

    #[test]
    fn rejects_duplicate_tokens() {
        let err = error_of(quote! { mod T { A { X; X; } } });
        assert!(err.contains("duplicate token `X`"));
    }

    #[test]
    fn rejects_duplicate_classes() {
        let err = error_of(quote! { mod T { A { X; } A { Y; } } });
        assert!(err.contains("duplicate class `A`"));
    }

    #[test]
    fn rejects_reserved_names() {
        let err = error_of(quote! { mod T { A { ID; } } });
        assert!(err.contains("reserved"));
    }

    #[test]
    fn rejects_class_named_class() {
        let err = error_of(quote! { mod T { A { Class { X; } } } });
        assert!(err.contains("reserved for the class marker"));

        let err = error_of(quote! { mod T { Class { X; } } });
        assert!(err.contains("reserved for the class marker"));
    }

    #[test]
    fn rejects_too_deep_hierarchies() {
        let err = error_of(quote! {
            mod T { L1 { L2 { L3 { L4 { L5 { L6 { L7 { L8 { L9 { X; } } } } } } } } } }
        });
        assert!(err.contains("exceeds maximum"));
    }

    #[test]
    fn rejects_misplaced_attributes() {
        let err = error_of(quote! { mod T { A { #[root] X; } } });
        assert!(err.contains("classes only"));

        let err = error_of(quote! { mod T { #[float = 1.0] A { X; } } });
        assert!(err.contains("tokens only"));

        let err = error_of(quote! { mod T { A { #[weight = 3] X; } } });
        assert!(err.contains("unsupported attribute"));
    }
}
