//! Procedural macros for declarative component definitions.
//!
//! # Aggregate Example
//!
//! ```rust,ignore
//! use meridian_macros::{aggregate, handles, applies, rejected};
//!
//! #[aggregate(domain = "player", state = PlayerState)]
//! impl PlayerAggregate {
//!     #[applies(PlayerRegistered)]
//!     fn apply_registered(state: &mut PlayerState, event: PlayerRegistered) {
//!         state.exists = true;
//!     }
//!
//!     #[handles(RegisterPlayer)]
//!     fn register(&self, cb: &CommandBook, cmd: RegisterPlayer, state: &PlayerState, seq: u32)
//!         -> CommandResult<EventBook> {
//!         // ...
//!     }
//!
//!     #[rejected(domain = "payment", command = "ProcessPayment")]
//!     fn handle_payment_rejected(&self, notification: &Notification, state: &PlayerState)
//!         -> CommandResult<EventBook> {
//!         // ...
//!     }
//! }
//! ```
//!
//! # Saga Example
//!
//! ```rust,ignore
//! use meridian_macros::{saga, prepares, reacts_to};
//!
//! #[saga(name = "saga-order-fulfillment", input = "order", output = "fulfillment")]
//! impl OrderFulfillmentSaga {
//!     #[prepares(OrderCompleted)]
//!     fn prepare_order(&self, event: &OrderCompleted) -> Vec<Cover> {
//!         // ...
//!     }
//!
//!     #[reacts_to(OrderCompleted)]
//!     fn handle_completed(&self, event: OrderCompleted, destinations: &[EventBook])
//!         -> CommandResult<Vec<CommandBook>> {
//!         // ...
//!     }
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Ident, ImplItem, ItemImpl, Meta, Token};

/// Marks an impl block as an aggregate with command handlers.
#[proc_macro_attribute]
pub fn aggregate(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as AggregateArgs);
    let input = parse_macro_input!(item as ItemImpl);
    TokenStream::from(expand_aggregate(args, input))
}

struct AggregateArgs {
    domain: String,
    state: Ident,
}

impl syn::parse::Parse for AggregateArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut domain = None;
        let mut state = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "domain" => domain = Some(input.parse::<syn::LitStr>()?.value()),
                "state" => state = Some(input.parse::<Ident>()?),
                _ => return Err(syn::Error::new(ident.span(), "unknown attribute")),
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(AggregateArgs {
            domain: domain
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "domain is required"))?,
            state: state
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "state is required"))?,
        })
    }
}

fn expand_aggregate(args: AggregateArgs, mut input: ItemImpl) -> TokenStream2 {
    let domain = &args.domain;
    let state_ty = &args.state;
    let self_ty = &input.self_ty;

    let mut handlers = Vec::new();
    let mut rejection_handlers = Vec::new();
    let mut appliers = Vec::new();

    for item in &input.items {
        if let ImplItem::Fn(method) = item {
            for attr in &method.attrs {
                if attr.path().is_ident("handles") {
                    if let Ok(command_type) = get_attr_ident(attr) {
                        handlers.push((method.sig.ident.clone(), command_type));
                    }
                } else if attr.path().is_ident("rejected") {
                    if let Ok((domain, command)) = get_rejected_args(attr) {
                        rejection_handlers.push((method.sig.ident.clone(), domain, command));
                    }
                } else if attr.path().is_ident("applies") {
                    if let Ok(event_type) = get_attr_ident(attr) {
                        appliers.push((method.sig.ident.clone(), event_type));
                    }
                }
            }
        }
    }

    let handler_registrations: Vec<_> = handlers
        .iter()
        .map(|(method, cmd_type)| {
            let cmd_str = cmd_type.to_string();
            quote! {
                .on(#cmd_str, {
                    let agg = agg.clone();
                    move |cb, cmd_any, state, seq| {
                        let cmd = <#cmd_type as prost::Message>::decode(cmd_any.value.as_slice())
                            .map_err(|e| meridian_core::CommandRejectedError::new(format!("failed to decode {}: {}", #cmd_str, e)))?;
                        agg.#method(cb, cmd, state, seq)
                    }
                })
            }
        })
        .collect();

    let rejection_registrations: Vec<_> = rejection_handlers
        .iter()
        .map(|(method, domain, command)| {
            quote! {
                .on_rejected(#domain, #command, {
                    let agg = agg.clone();
                    move |notification, state| agg.#method(notification, state)
                })
            }
        })
        .collect();

    let apply_arms: Vec<_> = appliers
        .iter()
        .map(|(method, event_type)| {
            let suffix = event_type.to_string();
            quote! {
                if event_any.type_url.ends_with(#suffix) {
                    if let Ok(event) = <#event_type as prost::Message>::decode(event_any.value.as_slice()) {
                        Self::#method(state, event);
                        return;
                    }
                }
            }
        })
        .collect();

    for item in &mut input.items {
        if let ImplItem::Fn(method) = item {
            method.attrs.retain(|attr| {
                !attr.path().is_ident("handles")
                    && !attr.path().is_ident("rejected")
                    && !attr.path().is_ident("applies")
            });
        }
    }

    let apply_event_fn = if !appliers.is_empty() {
        quote! {
            /// Apply a single event to state. Auto-generated from #[applies] methods.
            pub fn apply_event(state: &mut #state_ty, event_any: &prost_types::Any) {
                #(#apply_arms)*
                // Unknown event type: silently ignored (forward compatibility).
            }

            /// Rebuild state from event book. Auto-generated.
            pub fn rebuild(events: &meridian_core::proto::EventBook) -> #state_ty {
                let mut state = #state_ty::default();
                for page in &events.pages {
                    if let Some(event) = &page.event {
                        Self::apply_event(&mut state, event);
                    }
                }
                state
            }
        }
    } else {
        quote! {
            pub fn rebuild(_events: &meridian_core::proto::EventBook) -> #state_ty {
                #state_ty::default()
            }
        }
    };

    quote! {
        #input

        impl #self_ty {
            #apply_event_fn

            /// Creates a `CommandRouter` from this aggregate's annotated methods.
            pub fn into_router(self) -> meridian_core::CommandRouter<#state_ty>
            where
                Self: Send + Sync + 'static,
            {
                let agg = std::sync::Arc::new(self);
                meridian_core::CommandRouter::new(#domain, Self::rebuild)
                    #(#handler_registrations)*
                    #(#rejection_registrations)*
            }
        }
    }
}

/// Marks a method as a command handler. The real work happens in `#[aggregate]`.
#[proc_macro_attribute]
pub fn handles(_attr: TokenStream, item: TokenStream) -> TokenStream {
    item
}

/// Marks a method as a rejection handler, keyed by the rejected command's
/// domain and type. The real work happens in `#[aggregate]`/`#[process_manager]`.
#[proc_macro_attribute]
pub fn rejected(_attr: TokenStream, item: TokenStream) -> TokenStream {
    item
}

/// Marks a static function as an event applier for state reconstruction.
/// The real work happens in `#[aggregate]`/`#[process_manager]`.
#[proc_macro_attribute]
pub fn applies(_attr: TokenStream, item: TokenStream) -> TokenStream {
    item
}

/// Marks an impl block as a saga with event handlers.
#[proc_macro_attribute]
pub fn saga(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as SagaArgs);
    let input = parse_macro_input!(item as ItemImpl);
    TokenStream::from(expand_saga(args, input))
}

struct SagaArgs {
    name: String,
    input: String,
    output: String,
}

impl syn::parse::Parse for SagaArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut name = None;
        let mut input_domain = None;
        let mut output = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let value: syn::LitStr = input.parse()?;

            match ident.to_string().as_str() {
                "name" => name = Some(value.value()),
                "input" => input_domain = Some(value.value()),
                "output" => output = Some(value.value()),
                _ => return Err(syn::Error::new(ident.span(), "unknown attribute")),
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(SagaArgs {
            name: name
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "name is required"))?,
            input: input_domain
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "input is required"))?,
            output: output
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "output is required"))?,
        })
    }
}

fn expand_saga(args: SagaArgs, mut input: ItemImpl) -> TokenStream2 {
    let name = &args.name;
    let input_domain = &args.input;
    let output_domain = &args.output;
    let self_ty = &input.self_ty;

    let mut prepare_handlers = Vec::new();
    let mut event_handlers = Vec::new();

    for item in &input.items {
        if let ImplItem::Fn(method) = item {
            for attr in &method.attrs {
                if attr.path().is_ident("prepares") {
                    if let Ok(event_type) = get_attr_ident(attr) {
                        prepare_handlers.push((method.sig.ident.clone(), event_type));
                    }
                } else if attr.path().is_ident("reacts_to") {
                    if let Ok(event_type) = get_attr_ident(attr) {
                        event_handlers.push((method.sig.ident.clone(), event_type));
                    }
                }
            }
        }
    }

    let prepare_registrations: Vec<_> = prepare_handlers
        .iter()
        .map(|(method, event_type)| {
            let event_str = event_type.to_string();
            quote! {
                .prepare(#event_str, {
                    let saga = saga.clone();
                    move |_source, event_any| {
                        if let Ok(event) = <#event_type as prost::Message>::decode(event_any.value.as_slice()) {
                            saga.#method(&event)
                        } else {
                            vec![]
                        }
                    }
                })
            }
        })
        .collect();

    let handler_registrations: Vec<_> = event_handlers
        .iter()
        .map(|(method, event_type)| {
            let event_str = event_type.to_string();
            quote! {
                .on_many(#event_str, {
                    let saga = saga.clone();
                    move |_source, event_any, destinations| {
                        let event = <#event_type as prost::Message>::decode(event_any.value.as_slice())
                            .map_err(|e| meridian_core::CommandRejectedError::new(format!("failed to decode {}: {}", #event_str, e)))?;
                        saga.#method(event, destinations)
                    }
                })
            }
        })
        .collect();

    for item in &mut input.items {
        if let ImplItem::Fn(method) = item {
            method
                .attrs
                .retain(|attr| !attr.path().is_ident("prepares") && !attr.path().is_ident("reacts_to"));
        }
    }

    quote! {
        #input

        impl #self_ty {
            /// Creates an `EventRouter` from this saga's annotated methods.
            pub fn into_router(self) -> meridian_core::EventRouter
            where
                Self: Send + Sync + 'static,
            {
                let saga = std::sync::Arc::new(self);
                meridian_core::EventRouter::new(#name, #input_domain)
                    .sends_domain(#output_domain)
                    #(#prepare_registrations)*
                    #(#handler_registrations)*
            }
        }
    }
}

/// Marks a method as a prepare handler for destination declaration.
#[proc_macro_attribute]
pub fn prepares(_attr: TokenStream, item: TokenStream) -> TokenStream {
    item
}

/// Marks a method as an event handler that reacts to a triggering event.
#[proc_macro_attribute]
pub fn reacts_to(_attr: TokenStream, item: TokenStream) -> TokenStream {
    item
}

/// Marks an impl block as a process manager with event handlers.
#[proc_macro_attribute]
pub fn process_manager(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ProcessManagerArgs);
    let input = parse_macro_input!(item as ItemImpl);
    TokenStream::from(expand_process_manager(args, input))
}

struct ProcessManagerArgs {
    name: String,
    domain: String,
    state: Ident,
    inputs: Vec<String>,
}

impl syn::parse::Parse for ProcessManagerArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut name = None;
        let mut domain = None;
        let mut state = None;
        let mut inputs = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "name" => name = Some(input.parse::<syn::LitStr>()?.value()),
                "domain" => domain = Some(input.parse::<syn::LitStr>()?.value()),
                "state" => state = Some(input.parse::<Ident>()?),
                "inputs" => {
                    let content;
                    syn::bracketed!(content in input);
                    let mut domains = Vec::new();
                    while !content.is_empty() {
                        let lit: syn::LitStr = content.parse()?;
                        domains.push(lit.value());
                        if content.peek(Token![,]) {
                            content.parse::<Token![,]>()?;
                        }
                    }
                    inputs = Some(domains);
                }
                _ => return Err(syn::Error::new(ident.span(), "unknown attribute")),
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(ProcessManagerArgs {
            name: name
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "name is required"))?,
            domain: domain
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "domain is required"))?,
            state: state
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "state is required"))?,
            inputs: inputs
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "inputs is required"))?,
        })
    }
}

fn expand_process_manager(args: ProcessManagerArgs, mut input: ItemImpl) -> TokenStream2 {
    let name = &args.name;
    let pm_domain = &args.domain;
    let state_ty = &args.state;
    let inputs = &args.inputs;
    let self_ty = &input.self_ty;

    let mut prepare_handlers = Vec::new();
    let mut event_handlers = Vec::new();
    let mut rejection_handlers = Vec::new();
    let mut appliers = Vec::new();

    for item in &input.items {
        if let ImplItem::Fn(method) = item {
            for attr in &method.attrs {
                if attr.path().is_ident("prepares") {
                    if let Ok(event_type) = get_attr_ident(attr) {
                        prepare_handlers.push((method.sig.ident.clone(), event_type));
                    }
                } else if attr.path().is_ident("handles") {
                    if let Ok(event_type) = get_attr_ident(attr) {
                        event_handlers.push((method.sig.ident.clone(), event_type));
                    }
                } else if attr.path().is_ident("rejected") {
                    if let Ok((domain, command)) = get_rejected_args(attr) {
                        rejection_handlers.push((method.sig.ident.clone(), domain, command));
                    }
                } else if attr.path().is_ident("applies") {
                    if let Ok(event_type) = get_attr_ident(attr) {
                        appliers.push((method.sig.ident.clone(), event_type));
                    }
                }
            }
        }
    }

    let prepare_registrations: Vec<_> = prepare_handlers
        .iter()
        .map(|(method, event_type)| {
            let event_str = event_type.to_string();
            quote! {
                .prepare(#event_str, {
                    let pm = pm.clone();
                    move |trigger, state, event_any| {
                        if let Ok(event) = <#event_type as prost::Message>::decode(event_any.value.as_slice()) {
                            pm.#method(trigger, state, &event)
                        } else {
                            vec![]
                        }
                    }
                })
            }
        })
        .collect();

    let handler_registrations: Vec<_> = event_handlers
        .iter()
        .map(|(method, event_type)| {
            let event_str = event_type.to_string();
            quote! {
                .on(#event_str, {
                    let pm = pm.clone();
                    move |trigger, state, event_any, destinations| {
                        let event = <#event_type as prost::Message>::decode(event_any.value.as_slice())
                            .map_err(|e| meridian_core::CommandRejectedError::new(format!("failed to decode {}: {}", #event_str, e)))?;
                        pm.#method(trigger, state, event, destinations)
                    }
                })
            }
        })
        .collect();

    let rejection_registrations: Vec<_> = rejection_handlers
        .iter()
        .map(|(method, domain, command)| {
            quote! {
                .on_rejected(#domain, #command, {
                    let pm = pm.clone();
                    move |notification, state| pm.#method(notification, state)
                })
            }
        })
        .collect();

    let subscribes_registrations: Vec<_> = inputs.iter().map(|domain| quote! { .subscribes(#domain) }).collect();

    let apply_arms: Vec<_> = appliers
        .iter()
        .map(|(method, event_type)| {
            let suffix = event_type.to_string();
            quote! {
                if event_any.type_url.ends_with(#suffix) {
                    if let Ok(event) = <#event_type as prost::Message>::decode(event_any.value.as_slice()) {
                        Self::#method(state, event);
                        return;
                    }
                }
            }
        })
        .collect();

    for item in &mut input.items {
        if let ImplItem::Fn(method) = item {
            method.attrs.retain(|attr| {
                !attr.path().is_ident("prepares")
                    && !attr.path().is_ident("handles")
                    && !attr.path().is_ident("rejected")
                    && !attr.path().is_ident("applies")
            });
        }
    }

    let apply_event_fn = if !appliers.is_empty() {
        quote! {
            pub fn apply_event(state: &mut #state_ty, event_any: &prost_types::Any) {
                #(#apply_arms)*
                // Unknown event type: silently ignored (forward compatibility).
            }

            pub fn rebuild(events: &meridian_core::proto::EventBook) -> #state_ty {
                let mut state = #state_ty::default();
                for page in &events.pages {
                    if let Some(event) = &page.event {
                        Self::apply_event(&mut state, event);
                    }
                }
                state
            }
        }
    } else {
        quote! {
            pub fn rebuild(_events: &meridian_core::proto::EventBook) -> #state_ty {
                #state_ty::default()
            }
        }
    };

    quote! {
        #input

        impl #self_ty {
            #apply_event_fn

            /// Creates a `ProcessManagerRouter` from this process manager's annotated methods.
            pub fn into_router(self) -> meridian_core::ProcessManagerRouter<#state_ty>
            where
                Self: Send + Sync + 'static,
            {
                let pm = std::sync::Arc::new(self);
                meridian_core::ProcessManagerRouter::new(#name, #pm_domain, Self::rebuild)
                    #(#subscribes_registrations)*
                    #(#prepare_registrations)*
                    #(#handler_registrations)*
                    #(#rejection_registrations)*
            }
        }
    }
}

/// Marks a method as a projector event handler. The method decodes the
/// matched event and returns the projected payload, already packed as
/// `Option<prost_types::Any>`.
#[proc_macro_attribute]
pub fn projects(_attr: TokenStream, item: TokenStream) -> TokenStream {
    item
}

/// Marks an impl block as a projector with event handlers.
#[proc_macro_attribute]
pub fn projector(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ProjectorArgs);
    let input = parse_macro_input!(item as ItemImpl);
    TokenStream::from(expand_projector(args, input))
}

struct ProjectorArgs {
    name: String,
    inputs: Vec<String>,
}

impl syn::parse::Parse for ProjectorArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut name = None;
        let mut inputs = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "name" => name = Some(input.parse::<syn::LitStr>()?.value()),
                "inputs" => {
                    let content;
                    syn::bracketed!(content in input);
                    let mut domains = Vec::new();
                    while !content.is_empty() {
                        let lit: syn::LitStr = content.parse()?;
                        domains.push(lit.value());
                        if content.peek(Token![,]) {
                            content.parse::<Token![,]>()?;
                        }
                    }
                    inputs = Some(domains);
                }
                _ => return Err(syn::Error::new(ident.span(), "unknown attribute")),
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(ProjectorArgs {
            name: name
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "name is required"))?,
            inputs: inputs
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "inputs is required"))?,
        })
    }
}

fn expand_projector(args: ProjectorArgs, mut input: ItemImpl) -> TokenStream2 {
    let name = &args.name;
    let inputs = &args.inputs;
    let self_ty = &input.self_ty;

    let mut event_handlers = Vec::new();

    for item in &input.items {
        if let ImplItem::Fn(method) = item {
            for attr in &method.attrs {
                if attr.path().is_ident("projects") {
                    if let Ok(event_type) = get_attr_ident(attr) {
                        event_handlers.push((method.sig.ident.clone(), event_type));
                    }
                }
            }
        }
    }

    let handler_registrations: Vec<_> = event_handlers
        .iter()
        .map(|(method, event_type)| {
            let event_str = event_type.to_string();
            quote! {
                .on(#event_str, {
                    let projector = projector.clone();
                    move |event_any| {
                        let event = <#event_type as prost::Message>::decode(event_any.value.as_slice()).ok()?;
                        projector.#method(event)
                    }
                })
            }
        })
        .collect();

    for item in &mut input.items {
        if let ImplItem::Fn(method) = item {
            method.attrs.retain(|attr| !attr.path().is_ident("projects"));
        }
    }

    let subscribes_registrations: Vec<_> = inputs.iter().map(|domain| quote! { .subscribes(#domain) }).collect();

    quote! {
        #input

        impl #self_ty {
            /// Creates a `ProjectorRouter` from this projector's annotated methods.
            pub fn into_router(self) -> meridian_core::ProjectorRouter
            where
                Self: Send + Sync + 'static,
            {
                let projector = std::sync::Arc::new(self);
                meridian_core::ProjectorRouter::new(#name)
                    #(#subscribes_registrations)*
                    #(#handler_registrations)*
            }
        }
    }
}

/// Marks an impl block as an upcaster transforming old event versions to
/// current ones.
#[proc_macro_attribute]
pub fn upcaster(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as UpcasterArgs);
    let input = parse_macro_input!(item as ItemImpl);
    TokenStream::from(expand_upcaster(args, input))
}

struct UpcasterArgs {
    name: String,
    domain: String,
}

impl syn::parse::Parse for UpcasterArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut name = None;
        let mut domain = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let value: syn::LitStr = input.parse()?;

            match ident.to_string().as_str() {
                "name" => name = Some(value.value()),
                "domain" => domain = Some(value.value()),
                _ => return Err(syn::Error::new(ident.span(), "unknown attribute")),
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(UpcasterArgs {
            name: name
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "name is required"))?,
            domain: domain
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "domain is required"))?,
        })
    }
}

fn expand_upcaster(args: UpcasterArgs, mut input: ItemImpl) -> TokenStream2 {
    let name = &args.name;
    let domain = &args.domain;
    let self_ty = &input.self_ty;

    let mut transforms = Vec::new();

    for item in &input.items {
        if let ImplItem::Fn(method) = item {
            for attr in &method.attrs {
                if attr.path().is_ident("upcasts") {
                    if let Ok(from_type) = get_attr_ident(attr) {
                        transforms.push((method.sig.ident.clone(), from_type));
                    }
                }
            }
        }
    }

    let transform_registrations: Vec<_> = transforms
        .iter()
        .map(|(method, from_type)| {
            let suffix = from_type.to_string();
            quote! {
                .upcasts(#suffix, {
                    let upcaster = upcaster.clone();
                    move |event_any| {
                        match <#from_type as prost::Message>::decode(event_any.value.as_slice()) {
                            Ok(old) => upcaster.#method(old),
                            Err(_) => event_any.clone(),
                        }
                    }
                })
            }
        })
        .collect();

    for item in &mut input.items {
        if let ImplItem::Fn(method) = item {
            method.attrs.retain(|attr| !attr.path().is_ident("upcasts"));
        }
    }

    quote! {
        #input

        impl #self_ty {
            /// Creates an `UpcasterRouter` from this upcaster's annotated methods.
            pub fn into_router(self) -> meridian_core::UpcasterRouter
            where
                Self: Send + Sync + 'static,
            {
                let upcaster = std::sync::Arc::new(self);
                meridian_core::UpcasterRouter::new(#name, #domain)
                    #(#transform_registrations)*
            }
        }
    }
}

/// Marks a method as a version-transform handler. The method decodes the
/// old event version and returns the transformed event already packed as
/// `prost_types::Any`.
#[proc_macro_attribute]
pub fn upcasts(_attr: TokenStream, item: TokenStream) -> TokenStream {
    item
}

fn get_attr_ident(attr: &Attribute) -> syn::Result<Ident> {
    match attr.meta.clone() {
        Meta::List(list) => syn::parse2(list.tokens),
        _ => Err(syn::Error::new_spanned(attr, "expected #[attr(Type)]")),
    }
}

fn get_rejected_args(attr: &Attribute) -> syn::Result<(String, String)> {
    match attr.meta.clone() {
        Meta::List(list) => {
            let args: RejectedArgs = syn::parse2(list.tokens)?;
            Ok((args.domain, args.command))
        }
        _ => Err(syn::Error::new_spanned(
            attr,
            "expected #[rejected(domain = \"...\", command = \"...\")]",
        )),
    }
}

struct RejectedArgs {
    domain: String,
    command: String,
}

impl syn::parse::Parse for RejectedArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut domain = None;
        let mut command = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let value: syn::LitStr = input.parse()?;

            match ident.to_string().as_str() {
                "domain" => domain = Some(value.value()),
                "command" => command = Some(value.value()),
                _ => return Err(syn::Error::new(ident.span(), "unknown attribute")),
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(RejectedArgs {
            domain: domain
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "domain is required"))?,
            command: command
                .ok_or_else(|| syn::Error::new(proc_macro2::Span::call_site(), "command is required"))?,
        })
    }
}
