use crate::{
    api::{leave, loan, policy},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave::leave_list))
                            .route(web::post().to(leave::create_leave)),
                    )
                    // /leave/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave::get_leave))
                            .route(web::put().to(leave::update_leave))
                            .route(web::delete().to(leave::delete_leave)),
                    )
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve").route(web::put().to(leave::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(leave::reject_leave)),
                    ),
            )
            .service(
                web::scope("/loan")
                    // /loan
                    .service(
                        web::resource("")
                            .route(web::get().to(loan::loan_list))
                            .route(web::post().to(loan::create_loan)),
                    )
                    // /loan/allowance (must come before /{id})
                    .service(
                        web::resource("/allowance").route(web::get().to(loan::loan_allowance)),
                    )
                    // /loan/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(loan::get_loan))
                            .route(web::put().to(loan::update_loan))
                            .route(web::delete().to(loan::delete_loan)),
                    )
                    // /loan/{id}/approve
                    .service(
                        web::resource("/{id}/approve").route(web::put().to(loan::approve_loan)),
                    )
                    // /loan/{id}/reject
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(loan::reject_loan)),
                    ),
            )
            .service(
                web::scope("/policy")
                    .service(
                        web::resource("/leave")
                            .route(web::get().to(policy::list_leave_policies))
                            .route(web::post().to(policy::create_leave_policy)),
                    )
                    .service(
                        web::resource("/leave/{policy_id}")
                            .route(web::put().to(policy::update_leave_policy))
                            .route(web::delete().to(policy::delete_leave_policy)),
                    )
                    .service(
                        web::resource("/loan")
                            .route(web::get().to(policy::get_loan_policy))
                            .route(web::put().to(policy::upsert_loan_policy)),
                    ),
            ),
    );
}
