use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_code: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub total: i64,
    pub shipping_cost: i64,
    pub discount: i64,
    pub coupon_code: Option<String>,
    pub status: String,
    pub courier: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payment_proofs::Entity")]
    PaymentProofs,
    #[sea_orm(has_many = "super::notifications::Entity")]
    Notifications,
}

impl Related<super::payment_proofs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentProofs.def()
    }
}

impl Related<super::notifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
