//! Shared fixtures for hexeko-access integration tests.
//!
//! Every test gets its own in-memory SurrealDB with migrations applied,
//! two divisions and three financers:
//!
//! - division `north`: financers `acme` and `globex`
//! - division `south`: financer `initech`

#![allow(dead_code)]

use hexeko_access::{
    AuthorizationContext, InvitationConfig, InvitationMetricsService, InvitedUserService,
    RoleManagementService,
};
use hexeko_core::RoleName;
use hexeko_core::models::division::CreateDivision;
use hexeko_core::models::financer::{CreateFinancer, Financer};
use hexeko_core::models::membership::CreateMembership;
use hexeko_core::models::user::{CreateUser, InvitationMetadata, User};
use hexeko_core::repository::{
    DivisionRepository, FinancerRepository, MembershipRepository, UserRepository,
};
use hexeko_db::repository::{
    SurrealDivisionRepository, SurrealFinancerRepository, SurrealMembershipRepository,
    SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

pub type Users = SurrealUserRepository<Db>;
pub type Memberships = SurrealMembershipRepository<Db>;
pub type Financers = SurrealFinancerRepository<Db>;

async fn create_financer(repo: &Financers, division_id: Uuid, name: &str) -> Financer {
    repo.create(CreateFinancer {
        division_id,
        name: name.into(),
        metadata: None,
    })
    .await
    .unwrap()
}

pub struct World {
    pub db: Surreal<Db>,
    pub acme: Financer,
    pub globex: Financer,
    pub initech: Financer,
}

impl World {
    pub async fn new() -> Self {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        hexeko_db::run_migrations(&db).await.unwrap();

        let divisions = SurrealDivisionRepository::new(db.clone());
        let financers = SurrealFinancerRepository::new(db.clone());

        let north = divisions
            .create(CreateDivision {
                name: "North".into(),
                metadata: None,
            })
            .await
            .unwrap();
        let south = divisions
            .create(CreateDivision {
                name: "South".into(),
                metadata: None,
            })
            .await
            .unwrap();

        let acme = create_financer(&financers, north.id, "Acme").await;
        let globex = create_financer(&financers, north.id, "Globex").await;
        let initech = create_financer(&financers, south.id, "Initech").await;

        Self {
            db,
            acme,
            globex,
            initech,
        }
    }

    pub fn users(&self) -> Users {
        SurrealUserRepository::new(self.db.clone())
    }

    pub fn memberships(&self) -> Memberships {
        SurrealMembershipRepository::new(self.db.clone())
    }

    pub fn financers(&self) -> Financers {
        SurrealFinancerRepository::new(self.db.clone())
    }

    pub fn roles(&self) -> RoleManagementService<Users, Memberships, Financers> {
        RoleManagementService::new(self.users(), self.memberships(), self.financers())
    }

    pub fn invitations(
        &self,
        config: InvitationConfig,
    ) -> InvitedUserService<Users, Memberships, Financers> {
        InvitedUserService::new(self.users(), self.memberships(), self.financers(), config)
    }

    pub fn metrics(&self) -> InvitationMetricsService<Users> {
        InvitationMetricsService::new(self.users())
    }

    /// An onboarded user holding `global_roles`.
    pub async fn user(&self, email: &str, global_roles: Vec<RoleName>) -> User {
        self.users()
            .create(CreateUser {
                email: email.into(),
                first_name: "Test".into(),
                last_name: "User".into(),
                enabled: true,
                cognito_id: Some(format!("cognito-{email}")),
                locale: "fr-FR".into(),
                currency: "EUR".into(),
                timezone: "Europe/Paris".into(),
                global_roles,
                invitation_status: None,
                invitation_token: None,
                invited_at: None,
                invitation_expires_at: None,
                invited_by: None,
                invitation_metadata: InvitationMetadata::default(),
            })
            .await
            .unwrap()
    }

    /// An onboarded user with an active membership of `role` in
    /// `financer`.
    pub async fn member(&self, email: &str, financer: &Financer, role: RoleName) -> User {
        let user = self.user(email, Vec::new()).await;
        self.attach(&user, financer, role, true).await;
        user
    }

    pub async fn attach(&self, user: &User, financer: &Financer, role: RoleName, active: bool) {
        self.memberships()
            .attach(CreateMembership {
                user_id: user.id,
                financer_id: financer.id,
                role,
                active,
                valid_from: None,
                valid_to: None,
                language: None,
                attributes: None,
            })
            .await
            .unwrap();
    }

    pub async fn context(&self, user: &User, financer: Option<&Financer>) -> AuthorizationContext {
        self.roles()
            .resolve_context(user.id, financer.map(|f| f.id))
            .await
            .unwrap()
    }

    pub async fn user_count(&self) -> usize {
        let mut result = self.db.query("SELECT * FROM user").await.unwrap();
        let rows: Vec<surrealdb_types::Value> = result.take(0).unwrap();
        rows.len()
    }
}
