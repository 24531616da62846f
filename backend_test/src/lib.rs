use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, punctuated::Punctuated, spanned::Spanned, FnArg, Ident, ItemFn, Pat,
    Signature, Token, Type,
};

/// Transform an asynchronous test into a synchronous one and inject
/// dependencies.
///
/// By default every test runs against its own in-memory voter store, so
/// tests never share state, and logging from this crate is captured.
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// [`crate::store::Store`], and, when the test is marked
/// `#[backend_test(voter)]`, the [`rocket::http::Header`] carrying the bearer
/// token of a freshly registered voter.
///
/// `#[backend_test(mongo)]` backs the store with a freshly named MongoDB
/// database instead, which is dropped however the test terminates. These
/// tests need a server at `db_uri` and are ignored unless requested with
/// `cargo test -- --ignored`. The two arguments combine.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);
    let args = parse_macro_input!(args with Punctuated::<Ident, Token![,]>::parse_terminated);
    let mut login = false;
    let mut mongo = false;
    for arg in args {
        if arg == "voter" {
            login = true;
        } else if arg == "mongo" {
            mongo = true;
        } else {
            return syn::Error::new(arg.span(), "Expected `voter` and/or `mongo`")
                .into_compile_error()
                .into();
        }
    }

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(&item_fn.sig, login) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Pick the store backend.
    let (maybe_ignore, db_setup) = if mongo {
        (
            quote! { #[ignore = "needs a MongoDB server"] },
            quote! { Some(crate::test_database().await) },
        )
    } else {
        (quote! {}, quote! { None })
    };

    // Register a voter and keep their token if needed.
    let (maybe_login, auth_type, auth_binding) = if login {
        (
            quote! {
                let response = _rocket_client
                    .post("/api/vote/register")
                    .header(rocket::http::ContentType::JSON)
                    .body(rocket::serde::json::json!(crate::model::voter::Credentials::example()).to_string())
                    .dispatch()
                    .await;
                assert_eq!(rocket::http::Status::Created, response.status());
                let session: rocket::serde::json::Value = response.into_json().await.unwrap();
                let token = session["token"].as_str().unwrap();
                let _auth = rocket::http::Header::new("Authorization", format!("Bearer {token}"));
            },
            quote! { , rocket::http::Header<'static> },
            quote! { , _auth },
        )
    } else {
        (quote! {}, quote! {}, quote! {})
    };

    // Rewrite the test function.
    quote! {
        #[test]
        #maybe_ignore
        fn #name() {
            /// Test setup.
            async fn setup() -> (
                rocket::local::asynchronous::Client,
                crate::store::Store,
                Option<mongodb::Database>
                #auth_type
            ) {
                let db: Option<mongodb::Database> = #db_setup;
                let _store = match &db {
                    Some(db) => crate::store::Store::new(crate::store::MongoVoterStore::from_db(db)),
                    None => crate::store::Store::memory(),
                };
                let _rocket_client = rocket::local::asynchronous::Client::tracked(crate::test_rocket(_store.clone()))
                    .await
                    .unwrap();

                #maybe_login

                (_rocket_client, _store, db #auth_binding)
            }

            /// The test itself.
            #item_fn

            /// Test cleanup.
            async fn cleanup(db: Option<mongodb::Database>) {
                if let Some(db) = db {
                    db.drop(None).await.unwrap();
                }
            }

            log4rs_test_utils::test_logging::init_logging_once_for(["ballot_backend"], None, None);

            // Create an async runtime. We need a separate one for inside and
            // outside the `catch_unwind`. The inner one has several workers,
            // so that concurrent tests really race.
            let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("test-setup-cleanup")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            let inner_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(4)
                .enable_all()
                .build()
                .unwrap();

            // Run the setup.
            let (_rocket_client, _store, db #auth_binding) = outer_runtime.block_on(setup());

            // Run the test, catching any panics.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                inner_runtime.block_on(#new_name(#(#test_args),*));
            }));

            // Run the cleanup.
            outer_runtime.block_on(cleanup(db));

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: &Signature, login: bool) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_store = false;
    let mut has_auth = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                // Valid as the last path segment for any type is itself.
                if let Some(segment) = type_path.path.segments.last() {
                    let (seen, arg, what) = if segment.ident == "Client" {
                        (&mut has_client, quote! { _rocket_client }, "`Client`")
                    } else if segment.ident == "Store" {
                        (&mut has_store, quote! { _store.clone() }, "`Store`")
                    } else if segment.ident == "Header" {
                        if !login {
                            return Err(syn::Error::new(
                                input.span(),
                                "A `Header` can only be injected into `#[backend_test(voter)]`",
                            ));
                        }
                        (&mut has_auth, quote! { _auth.clone() }, "`Header`")
                    } else {
                        return Err(unexpected(input));
                    };
                    if *seen {
                        return Err(syn::Error::new(
                            input.span(),
                            format!("Test cannot accept more than one {what}"),
                        ));
                    }
                    *seen = true;
                    args.push(arg);
                    continue;
                }
            }
        }

        return Err(unexpected(input));
    }

    Ok(args)
}

fn unexpected(input: &FnArg) -> syn::Error {
    syn::Error::new(
        input.span(),
        "Expected one of `client_ident: Client`, `store_ident: Store` or `auth_ident: Header<'static>`",
    )
}
