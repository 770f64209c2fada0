extern crate proc_macro;

use kin_macros::{
    proc_macro2::TokenStream,
    quote::{
        quote,
        ToTokens,
    },
    syn::{
        self,
        parse_quote,
        punctuated::Punctuated,
        Data, DeriveInput, Error, Fields, GenericParam, Index, Path, Token, Type,
    },
};

#[inline]
fn kin_ecs(input: &DeriveInput) -> syn::Result<Path> {
    kin_macros::module("kin-ecs")?.ok_or_else(|| Error::new_spanned(input, "`kin-ecs` is unavailable."))
}

/// Returns the only field of a struct as an access expression (its name or `0`), its type, and
/// the expression constructing `Self` from a binding named `value`.
fn single_field(input: &DeriveInput, derive: &str) -> syn::Result<(TokenStream, Type, TokenStream)> {
    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(input, format!("Only `struct`s are allowed for deriving `{derive}`.")))
    };

    let mut fields = data.fields.iter();
    let (Some(field), None) = (fields.next(), fields.next()) else {
        return Err(Error::new_spanned(input, format!("`{derive}` structs must have exactly 1 field.")))
    };

    Ok(match &data.fields {
        Fields::Named(..) => {
            let ident = field.ident.as_ref().ok_or_else(|| Error::new_spanned(field, "Named field without a name."))?;
            (ident.to_token_stream(), field.ty.clone(), quote! { Self { #ident: value } })
        },
        _ => (Index::from(0).to_token_stream(), field.ty.clone(), quote! { Self(value) }),
    })
}

#[proc_macro_derive(Component)]
pub fn derive_component(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    match (move || -> syn::Result<TokenStream> {
        let mut input = syn::parse::<DeriveInput>(input)?;
        let kin_ecs = kin_ecs(&input)?;

        input.generics
            .make_where_clause()
            .predicates
            .push(parse_quote! { Self: 'static });

        let target = &input.ident;
        let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

        Ok(quote! {
            impl #impl_generics #kin_ecs::component::Component for #target #type_generics #where_clause {}
        })
    })() {
        Ok(stream) => stream,
        Err(e) => e.to_compile_error(),
    }.into()
}

#[proc_macro_derive(Property)]
pub fn derive_property(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    match (move || -> syn::Result<TokenStream> {
        let input = syn::parse::<DeriveInput>(input)?;
        let kin_ecs = kin_ecs(&input)?;
        let property = quote! { #kin_ecs::component::Property };

        let (field, value, construct) = single_field(&input, "Property")?;
        let target = &input.ident;
        let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

        let mut output = quote! {
            impl #impl_generics #property for #target #type_generics #where_clause {
                type Value = #value;

                #[inline]
                fn value(&self) -> &#value {
                    &self.#field
                }

                #[inline]
                fn value_mut(&mut self) -> &mut #value {
                    &mut self.#field
                }

                #[inline]
                fn from_value(value: #value) -> Self {
                    #construct
                }

                #[inline]
                fn into_value(self) -> #value {
                    self.#field
                }
            }

            impl #impl_generics ::std::ops::Deref for #target #type_generics #where_clause {
                type Target = #value;

                #[inline]
                fn deref(&self) -> &#value {
                    &self.#field
                }
            }

            impl #impl_generics ::std::ops::DerefMut for #target #type_generics #where_clause {
                #[inline]
                fn deref_mut(&mut self) -> &mut #value {
                    &mut self.#field
                }
            }

            impl #impl_generics ::std::convert::From<#value> for #target #type_generics #where_clause {
                #[inline]
                fn from(value: #value) -> Self {
                    #construct
                }
            }
        };

        // Converting back into a bare type parameter would break coherence.
        if input.generics.params.is_empty() {
            output.extend(quote! {
                impl ::std::convert::From<#target> for #value {
                    #[inline]
                    fn from(property: #target) -> Self {
                        property.#field
                    }
                }
            });
        }

        for (op_trait, op_fn, op) in [
            (quote! { AddAssign }, quote! { add_assign }, quote! { += }),
            (quote! { SubAssign }, quote! { sub_assign }, quote! { -= }),
            (quote! { MulAssign }, quote! { mul_assign }, quote! { *= }),
            (quote! { DivAssign }, quote! { div_assign }, quote! { /= }),
            (quote! { RemAssign }, quote! { rem_assign }, quote! { %= }),
        ] {
            let mut generics = input.generics.clone();
            generics.params.push(parse_quote! { __R });
            generics
                .make_where_clause()
                .predicates
                .push(parse_quote! { #value: ::std::ops::#op_trait<__R> });

            let (impl_generics, _, where_clause) = generics.split_for_impl();
            output.extend(quote! {
                impl #impl_generics ::std::ops::#op_trait<__R> for #target #type_generics #where_clause {
                    #[inline]
                    fn #op_fn(&mut self, rhs: __R) {
                        self.#field #op rhs;
                    }
                }
            });
        }

        let mut eq_generics = input.generics.clone();
        eq_generics.params.push(parse_quote! { __P: #property });
        let mut ord_generics = eq_generics.clone();

        eq_generics
            .make_where_clause()
            .predicates
            .push(parse_quote! { #value: ::std::cmp::PartialEq<<__P as #property>::Value> });
        ord_generics
            .make_where_clause()
            .predicates
            .push(parse_quote! { #value: ::std::cmp::PartialOrd<<__P as #property>::Value> });

        let (eq_impl_generics, _, eq_where_clause) = eq_generics.split_for_impl();
        let (ord_impl_generics, _, ord_where_clause) = ord_generics.split_for_impl();
        output.extend(quote! {
            impl #eq_impl_generics ::std::cmp::PartialEq<__P> for #target #type_generics #eq_where_clause {
                #[inline]
                fn eq(&self, other: &__P) -> bool {
                    self.#field == *<__P as #property>::value(other)
                }
            }

            impl #ord_impl_generics ::std::cmp::PartialOrd<__P> for #target #type_generics #ord_where_clause {
                #[inline]
                fn partial_cmp(&self, other: &__P) -> ::std::option::Option<::std::cmp::Ordering> {
                    ::std::cmp::PartialOrd::partial_cmp(&self.#field, <__P as #property>::value(other))
                }
            }
        });

        Ok(output)
    })() {
        Ok(stream) => stream,
        Err(e) => e.to_compile_error(),
    }.into()
}

#[proc_macro_derive(EntityAlias, attributes(alias))]
pub fn derive_entity_alias(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    match (move || -> syn::Result<TokenStream> {
        let input = syn::parse::<DeriveInput>(input)?;
        let kin_ecs = kin_ecs(&input)?;
        let (field, _, construct) = single_field(&input, "EntityAlias")?;

        let lifetime = input.generics.params
            .iter()
            .find_map(|param| match param {
                GenericParam::Lifetime(def) => Some(def.lifetime.clone()),
                _ => None,
            })
            .ok_or_else(|| Error::new_spanned(&input.generics, "`EntityAlias` structs must have a lifetime parameter for the manager."))?;

        let mut components = Vec::new();
        for attr in input.attrs.iter().filter(|&attr| attr.path().is_ident("alias")) {
            components.extend(attr.parse_args_with(Punctuated::<Type, Token![,]>::parse_terminated)?);
        }

        let target = &input.ident;
        let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

        Ok(quote! {
            impl #impl_generics #kin_ecs::entity::EntityAlias<#lifetime> for #target #type_generics #where_clause {
                type Components = (#(#components,)*);

                #[inline]
                fn from_entity(value: #kin_ecs::entity::Entity<#lifetime>) -> Self {
                    #construct
                }

                #[inline]
                fn entity(&self) -> #kin_ecs::entity::Entity<#lifetime> {
                    self.#field
                }
            }

            impl #impl_generics ::std::ops::Deref for #target #type_generics #where_clause {
                type Target = #kin_ecs::entity::Entity<#lifetime>;

                #[inline]
                fn deref(&self) -> &Self::Target {
                    &self.#field
                }
            }
        })
    })() {
        Ok(stream) => stream,
        Err(e) => e.to_compile_error(),
    }.into()
}
